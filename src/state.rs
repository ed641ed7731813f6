use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    ledger::{Ledger, ShippingPolicy},
    store::SeaOrmStore,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub ledger: Arc<Ledger<SeaOrmStore>>,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, shipping: ShippingPolicy) -> Self {
        let ledger = Ledger::new(SeaOrmStore::new(orm.clone()), shipping);
        Self {
            orm,
            ledger: Arc::new(ledger),
        }
    }
}
