//! Link-Map Tests
//!
//! Persisted shape of by-reference relationships: to-many fields as
//! `{id: true}` maps, to-one fields as bare id strings, and the
//! withholding rule for unsaved children.

use crate::common::*;

// ============================================================================
// To-Many Link-Maps
// ============================================================================

mod link_maps {
    use super::*;

    #[test]
    fn saved_children_serialize_as_id_map() {
        let t = TestAdapter::blog();
        let c1 = t.saved_comment("This is a new comment");
        let c2 = t.saved_comment("This is a second comment");

        let post = t.new_post("New Post");
        t.adapter
            .records()
            .push_link(&post, "comments", c1.clone())
            .unwrap();
        t.adapter
            .records()
            .push_link(&post, "comments", c2.clone())
            .unwrap();
        t.adapter.save(&post).unwrap();

        let comments = &t.node("posts", &post)["comments"];
        assert!(comments.is_object());
        assert_eq!(comments[c1.as_str()], json!(true));
        assert_eq!(comments[c2.as_str()], json!(true));
        assert_eq!(comments.as_object().unwrap().len(), 2);
    }

    #[test]
    fn dirty_child_link_is_written() {
        let t = TestAdapter::blog();
        let comment = t.saved_comment("This is a new comment");

        // Dirty the child; it has been persisted before, so its link
        // is still addressable.
        t.adapter
            .records()
            .set_attribute(&comment, "body", json!("edited"))
            .unwrap();
        assert_eq!(
            t.adapter.records().status(&comment),
            Some(RecordStatus::Dirty)
        );

        let post = t.new_post("New Post");
        t.adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();
        t.adapter.save(&post).unwrap();

        assert_eq!(
            t.node("posts", &post)["comments"][comment.as_str()],
            json!(true)
        );
    }

    #[test]
    fn removing_one_link_keeps_siblings() {
        let t = TestAdapter::blog();
        let c1 = t.saved_comment("first");
        let c2 = t.saved_comment("second");

        let post = t.new_post("New Post");
        t.adapter
            .records()
            .push_link(&post, "comments", c1.clone())
            .unwrap();
        t.adapter
            .records()
            .push_link(&post, "comments", c2.clone())
            .unwrap();
        t.adapter.save(&post).unwrap();

        t.adapter
            .records()
            .remove_link(&post, "comments", &c1)
            .unwrap();
        t.adapter.save(&post).unwrap();

        let comments = &t.node("posts", &post)["comments"];
        assert_eq!(comments.get(c1.as_str()), None);
        assert_eq!(comments[c2.as_str()], json!(true));
    }

    #[test]
    fn removing_last_link_removes_the_whole_field() {
        let t = TestAdapter::blog();
        let comment = t.saved_comment("only one");

        let post = t.new_post("New Post");
        t.adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();
        t.adapter.save(&post).unwrap();
        assert!(t.node("posts", &post)["comments"].is_object());

        t.adapter
            .records()
            .remove_link(&post, "comments", &comment)
            .unwrap();
        t.adapter.save(&post).unwrap();

        // Not an empty map: the field itself is gone.
        let node = t.node("posts", &post);
        assert_eq!(node.get("comments"), None);
        assert_eq!(node["title"], json!("New Post"));
    }

    #[test]
    fn empty_collection_is_never_persisted() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        t.adapter.save(&post).unwrap();

        let node = t.node("posts", &post);
        assert_eq!(node.get("comments"), None);
    }

    #[test]
    fn numeric_ids_round_trip_as_keys() {
        let t = TestAdapter::blog();
        let comment = t.adapter.records().create_with_id("comment", RecordId::from("12"));
        t.adapter
            .records()
            .set_attribute(&comment, "body", json!("numeric id"))
            .unwrap();
        t.adapter.save(&comment).unwrap();

        let post = t.adapter.records().create_with_id("post", RecordId::from("1"));
        t.adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();
        t.adapter.save(&post).unwrap();

        assert_eq!(t.node("posts", &post)["comments"]["12"], json!(true));
    }
}

// ============================================================================
// Withholding Unsaved Children
// ============================================================================

mod withholding {
    use super::*;

    #[test]
    fn new_child_is_withheld_without_error() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        let comment = t.adapter.records().create("comment");
        t.adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();

        let report = t.adapter.save(&post).unwrap();
        assert_eq!(report.outcome, SaveOutcome::Written);
        assert!(report.skipped.is_empty());
        assert_eq!(t.node("posts", &post).get("comments"), None);
    }

    #[test]
    fn link_appears_once_child_and_parent_are_saved() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        let comment = t.adapter.records().create("comment");
        t.adapter
            .records()
            .set_attribute(&comment, "body", json!("This is a new comment"))
            .unwrap();
        t.adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();

        t.adapter.save(&post).unwrap();
        t.adapter.save(&comment).unwrap();
        t.adapter.save(&post).unwrap();

        assert_eq!(
            t.node("posts", &post)["comments"][comment.as_str()],
            json!(true)
        );
        assert_eq!(
            t.node("comments", &comment)["body"],
            json!("This is a new comment")
        );
    }

    #[test]
    fn withheld_link_is_not_in_snapshot_baseline() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        let comment = t.adapter.records().create("comment");
        t.adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();
        t.adapter.save(&post).unwrap();
        t.adapter.save(&comment).unwrap();

        // The second parent save must see the link as new, not as
        // already committed.
        let report = t.adapter.save(&post).unwrap();
        assert_eq!(report.outcome, SaveOutcome::Written);
    }

    #[test]
    fn saved_siblings_still_serialize_next_to_withheld_child() {
        let t = TestAdapter::blog();
        let saved = t.saved_comment("persisted");
        let unsaved = t.adapter.records().create("comment");

        let post = t.new_post("New Post");
        t.adapter
            .records()
            .push_link(&post, "comments", saved.clone())
            .unwrap();
        t.adapter
            .records()
            .push_link(&post, "comments", unsaved.clone())
            .unwrap();
        t.adapter.save(&post).unwrap();

        let comments = &t.node("posts", &post)["comments"];
        assert_eq!(comments[saved.as_str()], json!(true));
        assert_eq!(comments.get(unsaved.as_str()), None);
    }

    #[test]
    fn child_whose_first_save_failed_stays_withheld() {
        use std::sync::Arc;

        let tree = Arc::new(FailingTree::new());
        let adapter = Adapter::new(tree.clone(), blog_schema());

        let comment = adapter.records().create("comment");
        adapter
            .records()
            .set_attribute(&comment, "body", json!("This is a new comment"))
            .unwrap();
        tree.fail_writes(1);
        adapter.save(&comment).unwrap_err();

        let post = adapter.records().create("post");
        adapter
            .records()
            .set_attribute(&post, "title", json!("New Post"))
            .unwrap();
        adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();
        adapter.save(&post).unwrap();

        // The child was never persisted, so no link entry is written.
        let node = &tree.dump()["posts"][post.as_str()];
        assert_eq!(node.get("comments"), None);
        assert_eq!(node["title"], json!("New Post"));
    }

    #[test]
    fn unregistered_ids_are_presumed_persisted() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        // Never created through this registry, e.g. linked by id from
        // data loaded elsewhere.
        t.adapter
            .records()
            .push_link(&post, "comments", RecordId::from("remote-comment"))
            .unwrap();
        t.adapter.save(&post).unwrap();

        assert_eq!(
            t.node("posts", &post)["comments"]["remote-comment"],
            json!(true)
        );
    }
}

// ============================================================================
// To-One References
// ============================================================================

mod references {
    use super::*;

    #[test]
    fn belongs_to_serializes_as_bare_id() {
        let t = TestAdapter::blog();
        let user = t.adapter.records().create_with_id("user", RecordId::from("u1"));
        t.adapter.save(&user).unwrap();

        let post = t.new_post("New Post");
        t.adapter
            .records()
            .set_reference(&post, "user", Some(RecordId::from("u1")))
            .unwrap();
        t.adapter.save(&post).unwrap();

        assert_eq!(t.node("posts", &post)["user"], json!("u1"));
    }

    #[test]
    fn null_belongs_to_is_absent_from_the_node() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        t.adapter.records().set_reference(&post, "user", None).unwrap();
        t.adapter.save(&post).unwrap();

        let node = t.node("posts", &post);
        assert_eq!(node.get("user"), None);
    }

    #[test]
    fn clearing_belongs_to_removes_the_field() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        t.adapter
            .records()
            .set_reference(&post, "user", Some(RecordId::from("u1")))
            .unwrap();
        t.adapter.save(&post).unwrap();
        assert_eq!(t.node("posts", &post)["user"], json!("u1"));

        t.adapter.records().set_reference(&post, "user", None).unwrap();
        t.adapter.save(&post).unwrap();
        assert_eq!(t.node("posts", &post).get("user"), None);
    }

    #[test]
    fn multi_relationship_save_preserves_sibling_fields() {
        let t = TestAdapter::blog();
        let comment = t.saved_comment("body");
        let post = t.new_post("New Post");
        t.adapter
            .records()
            .push_link(&post, "comments", comment.clone())
            .unwrap();
        t.adapter
            .records()
            .set_reference(&post, "user", Some(RecordId::from("u1")))
            .unwrap();
        t.adapter.save(&post).unwrap();

        // Changing one relationship leaves the other untouched.
        t.adapter
            .records()
            .set_reference(&post, "user", Some(RecordId::from("u2")))
            .unwrap();
        t.adapter.save(&post).unwrap();

        let node = t.node("posts", &post);
        assert_eq!(node["user"], json!("u2"));
        assert_eq!(node["comments"][comment.as_str()], json!(true));
        assert_eq!(node["title"], json!("New Post"));
    }
}
