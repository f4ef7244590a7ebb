//! Read Reconstruction Tests
//!
//! Rebuilding typed relationship values from raw nodes: lazy to-many
//! collections, absent fields as empty values, and reload adoption.

use crate::common::*;

// ============================================================================
// Reconstruction
// ============================================================================

mod reconstruction {
    use super::*;

    #[test]
    fn raw_node_splits_into_attributes_and_relationships() {
        let t = TestAdapter::blog();
        t.seed(
            "posts/p1",
            json!({
                "title": "New Post",
                "published": true,
                "comments": {"c1": true, "c2": true},
                "user": "u1"
            }),
        );

        let view = t
            .adapter
            .fetch(&TypeName::new("post"), &RecordId::from("p1"))
            .unwrap()
            .unwrap();

        assert_eq!(view.attribute("title"), Some(&json!("New Post")));
        assert_eq!(view.attribute("published"), Some(&json!(true)));
        assert_eq!(view.attributes.get("comments"), None);
        assert_eq!(view.one("user"), Some(&RecordId::from("u1")));
        assert_eq!(view.many("comments").unwrap().len(), 2);
    }

    #[test]
    fn absent_fields_read_as_empty_values() {
        let t = TestAdapter::blog();
        t.seed("posts/p1", json!({"title": "New Post"}));

        let view = t
            .adapter
            .fetch(&TypeName::new("post"), &RecordId::from("p1"))
            .unwrap()
            .unwrap();
        assert!(view.many("comments").unwrap().is_empty());
        assert_eq!(view.one("user"), None);
    }

    #[test]
    fn lazy_collection_fetches_linked_records_on_demand() {
        let t = TestAdapter::blog();
        t.seed(
            "comments/c1",
            json!({"body": "This is a new comment"}),
        );
        t.seed("posts/p1", json!({"comments": {"c1": true}}));

        let view = t
            .adapter
            .fetch(&TypeName::new("post"), &RecordId::from("p1"))
            .unwrap()
            .unwrap();
        let collection = view.many("comments").unwrap();
        assert!(collection.contains(&RecordId::from("c1")));

        let resolved = collection
            .resolve(t.tree.as_ref(), t.adapter.schema())
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved[0].attribute("body"),
            Some(&json!("This is a new comment"))
        );
    }

    #[test]
    fn numeric_id_references_decode_as_strings() {
        let t = TestAdapter::blog();
        t.seed("posts/p1", json!({"user": 42}));

        let view = t
            .adapter
            .fetch(&TypeName::new("post"), &RecordId::from("p1"))
            .unwrap()
            .unwrap();
        assert_eq!(view.one("user"), Some(&RecordId::from("42")));
    }

    #[test]
    fn fetching_a_missing_node_returns_none() {
        let t = TestAdapter::blog();
        let result = t
            .adapter
            .fetch(&TypeName::new("post"), &RecordId::from("nope"))
            .unwrap();
        assert!(result.is_none());
    }
}

// ============================================================================
// Reload
// ============================================================================

mod reload {
    use super::*;

    #[test]
    fn reload_adopts_remote_edits() {
        let t = TestAdapter::blog();
        let post = t.new_post("before");
        t.adapter.save(&post).unwrap();

        t.seed(&format!("posts/{}/title", post.as_str()), json!("after"));

        let view = t.adapter.reload(&post).unwrap();
        assert_eq!(view.attribute("title"), Some(&json!("after")));
        assert_eq!(
            t.adapter
                .records()
                .with_record(&post, |r| r.attribute("title").cloned())
                .unwrap(),
            Some(json!("after"))
        );
    }

    #[test]
    fn reload_resets_the_diff_baseline() {
        let t = TestAdapter::blog();
        let post = t.new_post("before");
        t.adapter.save(&post).unwrap();
        t.seed(&format!("posts/{}/title", post.as_str()), json!("after"));

        t.adapter.reload(&post).unwrap();
        assert_eq!(t.adapter.records().status(&post), Some(RecordStatus::Saved));
        assert_eq!(
            t.adapter.save(&post).unwrap().outcome,
            SaveOutcome::NoChanges
        );
    }

    #[test]
    fn reload_materializes_link_maps_into_slots() {
        let t = TestAdapter::blog();
        let comment = t.saved_comment("This is a new comment");
        let post = t.new_post("New Post");
        t.adapter.save(&post).unwrap();

        // Link added remotely, unknown to the local record.
        let mut links = Map::new();
        links.insert(comment.as_str().to_string(), json!(true));
        t.seed(
            &format!("posts/{}/comments", post.as_str()),
            Value::Object(links),
        );

        let view = t.adapter.reload(&post).unwrap();
        assert!(view.many("comments").unwrap().contains(&comment));
        assert_eq!(
            t.adapter
                .records()
                .with_record(&post, |r| r.links("comments").to_vec())
                .unwrap(),
            vec![comment.clone()]
        );
    }

    #[test]
    fn reload_of_a_vanished_record_errors() {
        let t = TestAdapter::blog();
        let post = t.new_post("New Post");
        // Saved nothing; the node does not exist.
        assert!(matches!(
            t.adapter.reload(&post),
            Err(Error::UnknownRecord(_))
        ));
    }

    #[test]
    fn reload_adopts_embedded_children_into_the_registry() {
        let t = TestAdapter::blog_embedded();
        let post = t.adapter.records().create_with_id("post", RecordId::from("p1"));
        t.adapter.save(&post).unwrap();
        t.seed(
            "posts/p1",
            json!({
                "title": "New Post",
                "comments": {"c9": {"body": "remote comment"}}
            }),
        );

        t.adapter.reload(&post).unwrap();
        assert_eq!(
            t.adapter.records().status(&RecordId::from("c9")),
            Some(RecordStatus::Saved)
        );
    }
}
