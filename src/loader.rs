//! Runs reducer effects against a [`CatalogClient`].
//!
//! Every effect resolves to exactly one result action, so the loading flags
//! the reducer raised are always lowered again, whether the fetch succeeds or
//! fails.

use std::sync::Arc;

use tui_dispatch::{EffectContext, TaskKey};

use crate::action::Action;
use crate::api::CatalogClient;
use crate::effect::Effect;

#[derive(Clone)]
pub struct Loader {
    client: Arc<dyn CatalogClient>,
}

impl Loader {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }

    pub async fn run(&self, effect: Effect) -> Action {
        match effect {
            Effect::FetchPage { offset, limit } => {
                match self.client.fetch_page(offset, limit).await {
                    Ok(items) => Action::ListDidLoad(items),
                    Err(error) => Action::ListDidError(error),
                }
            }
            Effect::FetchDetail { id } => match self.client.fetch_detail(id).await {
                Ok(detail) => Action::DetailDidLoad(detail),
                Err(error) => Action::DetailDidError { id, error },
            },
        }
    }

    pub fn spawn(&self, effect: Effect, ctx: &mut EffectContext<Action>) {
        let key = match &effect {
            Effect::FetchPage { offset, .. } => format!("page_{offset}"),
            Effect::FetchDetail { id } => format!("detail_{id}"),
        };
        let loader = self.clone();
        ctx.tasks()
            .spawn(TaskKey::new(key), async move { loader.run(effect).await });
    }
}
