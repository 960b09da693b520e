//! Running effect descriptions inside tests.
//!
//! Reducers return effects as values. Tests that need to follow the feedback
//! loop (load → loaded, mutate → refetch) run them here and dispatch the
//! collected actions themselves.

use futures::future::{join_all, BoxFuture, FutureExt};
use helpdesk_core::effect::Effect;

/// Run every effect and collect the actions they feed back, in order.
///
/// `Parallel` children run concurrently but their actions are returned in
/// declaration order.
pub async fn run_effects<A, I>(effects: I) -> Vec<A>
where
    A: Send + 'static,
    I: IntoIterator<Item = Effect<A>>,
{
    let mut actions = Vec::new();
    for effect in effects {
        actions.extend(run_one(effect).await);
    }
    actions
}

fn run_one<A>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>>
where
    A: Send + 'static,
{
    async move {
        match effect {
            Effect::None => Vec::new(),
            Effect::Future(future) => future.await.into_iter().collect(),
            Effect::Parallel(effects) => join_all(effects.into_iter().map(run_one))
                .await
                .into_iter()
                .flatten()
                .collect(),
        }
    }
    .boxed()
}
