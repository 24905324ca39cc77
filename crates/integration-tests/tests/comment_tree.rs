use integration_tests::{at, Layout, Stack};
use uuid::Uuid;

fn ids(nodes: &[domains::Comment]) -> Vec<Uuid> {
    nodes.iter().map(|c| c.id).collect()
}

#[tokio::test]
async fn propagation_reaches_the_post_from_any_depth() {
    for layout in [Layout::ChildList, Layout::ParentPointer] {
        let stack = Stack::inline(layout);
        let u1 = stack.user("u1").await;
        let p1 = stack.post(u1, "p1", 0).await;
        let c1 = stack.reply(p1, u1, "c1", 10).await;
        let c2 = stack.reply(c1, u1, "c2", 20).await;

        stack.reply(c1, u1, "hi", 100).await;
        assert_eq!(stack.comment_updated_at(c1).await, at(100), "{layout:?}");
        assert_eq!(stack.post_updated_at(p1).await, at(100), "{layout:?}");

        stack.reply(c2, u1, "deeper", 200).await;
        for comment in [c2, c1] {
            assert_eq!(stack.comment_updated_at(comment).await, at(200), "{layout:?}");
        }
        assert_eq!(stack.post_updated_at(p1).await, at(200), "{layout:?}");
    }
}

#[tokio::test]
async fn background_propagation_is_eventual() {
    let mut stack = Stack::background(Layout::ChildList);
    let author = stack.user("author").await;
    let post = stack.post(author, "busy thread", 0).await;

    let mut parent = post;
    for depth in 1..=5 {
        parent = stack.reply(parent, author, &format!("depth {depth}"), depth * 100).await;
    }
    stack.drain().await;

    assert!(stack.post_updated_at(post).await >= at(500));
    assert_eq!(stack.comments.propagator().stats().completed, 5);
    assert_eq!(stack.comments.propagator().stats().failed, 0);
}

#[tokio::test]
async fn tree_survives_a_missing_author() {
    let stack = Stack::inline(Layout::ChildList);
    let author = stack.user("author").await;
    let post = stack.post(author, "mixed", 0).await;

    let kept = stack.reply(post, author, "kept", 10).await;
    let ghost = stack.reply(post, Uuid::now_v7(), "ghost", 20).await;
    stack.reply(ghost, author, "under ghost", 21).await;
    let sibling = stack.reply(post, author, "sibling", 30).await;
    let nested = stack.reply(sibling, author, "nested", 31).await;

    let tree = stack.comments.build_tree(post).await.unwrap();
    let mut roots = ids(&tree);
    roots.sort();
    let mut expected = vec![kept, sibling];
    expected.sort();
    assert_eq!(roots, expected);

    let sibling_node = tree.iter().find(|c| c.id == sibling).unwrap();
    assert_eq!(ids(&sibling_node.children), vec![nested]);
    assert_eq!(sibling_node.author_profile.name, "author");
}

#[tokio::test]
async fn votes_reorder_siblings() {
    let stack = Stack::inline(Layout::ParentPointer);
    let author = stack.user("author").await;
    let post = stack.post(author, "ranked", 0).await;
    let first = stack.reply(post, author, "first", 10).await;
    let second = stack.reply(post, author, "second", 20).await;

    // Equal scores: the fresher comment leads.
    let tree = stack.comments.build_tree(post).await.unwrap();
    assert_eq!(ids(&tree), vec![second, first]);

    stack
        .votes
        .apply_vote(domains::VoteRequest {
            target_id: first,
            user_id: Uuid::now_v7(),
            is_post: false,
            delta: 1,
            vote_status: None,
        })
        .await
        .unwrap();

    let tree = stack.comments.build_tree(post).await.unwrap();
    assert_eq!(ids(&tree), vec![first, second]);
    assert_eq!(tree, stack.comments.build_tree(post).await.unwrap());
}

#[tokio::test]
async fn post_without_comments_has_an_empty_tree() {
    let stack = Stack::inline(Layout::ChildList);
    let author = stack.user("author").await;
    let post = stack.post(author, "silent", 0).await;
    assert!(stack.comments.build_tree(post).await.unwrap().is_empty());
}
