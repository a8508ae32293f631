//! Isolation and restore tests for context scopes.

#[cfg(test)]
mod tests {
    use crate::context::{self, ContextValue};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_sibling_scopes_are_isolated() {
        let barrier = Arc::new(Barrier::new(2));

        let left = {
            let barrier = barrier.clone();
            context::run(async move {
                context::set("owner", "left");
                barrier.wait().await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                context::get_str("owner")
            })
        };
        let right = {
            let barrier = barrier.clone();
            context::run(async move {
                context::set("owner", "right");
                barrier.wait().await;
                context::get_str("owner")
            })
        };

        let (left, right) = tokio::join!(left, right);
        assert_eq!(left.as_deref(), Some("left"));
        assert_eq!(right.as_deref(), Some("right"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_spawned_scopes_are_isolated() {
        let mut handles = Vec::new();

        for i in 0..64 {
            handles.push(tokio::spawn(context::run(async move {
                let id = format!("req-{i}");
                context::set_correlation_id(id.clone());
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                    assert_eq!(context::correlation_id().as_deref(), Some(id.as_str()));
                }
                context::correlation_id()
            })));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let seen = handle.await.unwrap();
            assert_eq!(seen, Some(format!("req-{i}")));
        }
    }

    #[tokio::test]
    async fn test_child_inherits_then_parent_is_restored() {
        context::run(async {
            context::set("a", "parent");
            context::set("shared", "original");

            context::run(async {
                assert_eq!(context::get_str("a").as_deref(), Some("parent"));
                context::set("shared", "mutated");
                context::set("child_only", "x");
            })
            .await;

            assert_eq!(context::get_str("shared").as_deref(), Some("original"));
            assert_eq!(context::get("child_only"), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_parent_restored_after_child_error() {
        context::run(async {
            context::set("state", "before");

            let result: Result<(), String> = context::run(async {
                context::set("state", "inside");
                tokio::task::yield_now().await;
                Err("child failed".to_string())
            })
            .await;

            assert!(result.is_err());
            assert_eq!(context::get_str("state").as_deref(), Some("before"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_parent_restored_after_child_panic() {
        context::run(async {
            context::set("state", "before");

            let child = tokio::spawn(context::run(async {
                context::set("state", "inside");
                panic!("child panicked");
            }));
            assert!(child.await.is_err());

            assert_eq!(context::get_str("state").as_deref(), Some("before"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_child_snapshot_taken_at_creation() {
        context::run(async {
            context::set("v", "1");
            let child = context::run(async {
                tokio::task::yield_now().await;
                context::get_str("v")
            });
            context::set("v", "2");

            assert_eq!(child.await.as_deref(), Some("1"));
            assert_eq!(context::get_str("v").as_deref(), Some("2"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_spawned_scope_inherits_from_spawner() {
        context::run(async {
            context::set_correlation_id("spawner");
            let handle = tokio::spawn(context::run(async {
                context::set("worker", "yes");
                context::correlation_id()
            }));
            assert_eq!(handle.await.unwrap().as_deref(), Some("spawner"));
            assert_eq!(context::get("worker"), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_outside_any_scope() {
        assert!(!context::is_active());
        context::set("k", "v");
        assert_eq!(context::get("k"), None);
        assert!(context::get_all().is_empty());
        assert_eq!(context::correlation_id(), None);
        assert!(context::trace_context_headers().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_is_a_copy() {
        context::run(async {
            context::set("a", "1");
            let mut copy = context::get_all();
            copy.insert("b".to_string(), ContextValue::from("2"));
            assert_eq!(context::get("b"), None);
        })
        .await;
    }
}
