//! Ownership traversal
//!
//! Runs for every visited object. Owners are walked "up" without expanding
//! their own descendants; controlled children are walked "down".

use super::{Direction, TaskGroup, Traversal};
use crate::error::GraphResult;
use crate::models::object;
use futures::future::try_join_all;
use kube::core::DynamicObject;
use std::sync::Arc;

pub(super) async fn visit(
    traversal: &Arc<Traversal>,
    object: &DynamicObject,
    visit_descendants: bool,
    level: usize,
) -> GraphResult<()> {
    tokio::try_join!(
        ancestors(traversal, object, level),
        descendants(traversal, object, visit_descendants, level),
    )?;
    Ok(())
}

async fn ancestors(
    traversal: &Arc<Traversal>,
    object: &DynamicObject,
    level: usize,
) -> GraphResult<()> {
    let references = object::owner_references(object);
    if references.is_empty() {
        return Ok(());
    }

    let namespace = object::namespace(object);
    let lookups = references
        .iter()
        .map(|reference| traversal.queryer().owner_reference(namespace, reference));
    let owners = try_join_all(lookups).await?;

    let mut group = TaskGroup::new();
    for owner in owners.into_iter().flatten() {
        group.spawn(traversal.visit_related(
            object,
            owner,
            Direction::Outgoing,
            false,
            level,
            level + 1,
        ));
    }
    group.join().await
}

async fn descendants(
    traversal: &Arc<Traversal>,
    object: &DynamicObject,
    visit_descendants: bool,
    level: usize,
) -> GraphResult<()> {
    if !visit_descendants {
        return Ok(());
    }

    let children = traversal.queryer().children(object).await?;
    let mut group = TaskGroup::new();
    for child in children {
        group.spawn(traversal.visit_related(
            object,
            child,
            Direction::Outgoing,
            true,
            level,
            level + 1,
        ));
    }
    group.join().await
}
