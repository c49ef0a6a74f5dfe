//! Shared application state and storage backends.

use std::sync::Arc;

use domain::{AccountService, ProductService};
use fulfillment::FulfillmentService;
use sqlx::PgPool;
use store::{
    CatalogStore, InMemoryCatalogStore, InMemoryOrderStore, InMemoryUserStore, OrderStore,
    PostgresCatalogStore, PostgresOrderStore, PostgresUserStore, UserStore,
};

use crate::config::Config;
use crate::mailer::{EmailNotifier, MailTransport, Mailer};

/// A family of stores the application can run on.
pub trait Backend: Send + Sync + 'static {
    const NAME: &'static str;

    type Catalog: CatalogStore + Clone + 'static;
    type Orders: OrderStore + Clone + 'static;
    type Users: UserStore + Clone + 'static;
}

/// In-memory stores; state is lost on restart.
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    const NAME: &'static str = "memory";
    type Catalog = InMemoryCatalogStore;
    type Orders = InMemoryOrderStore;
    type Users = InMemoryUserStore;
}

/// PostgreSQL stores sharing one pool.
pub struct PostgresBackend;

impl Backend for PostgresBackend {
    const NAME: &'static str = "postgres";
    type Catalog = PostgresCatalogStore;
    type Orders = PostgresOrderStore;
    type Users = PostgresUserStore;
}

pub type Fulfillment<B> = FulfillmentService<
    <B as Backend>::Catalog,
    <B as Backend>::Orders,
    EmailNotifier<<B as Backend>::Users>,
>;

/// Shared application state accessible from all handlers.
pub struct AppState<B: Backend> {
    pub accounts: AccountService<B::Users>,
    pub products: ProductService<B::Catalog>,
    pub fulfillment: Fulfillment<B>,
    pub mailer: Mailer,
}

impl<B: Backend> AppState<B> {
    /// Wires services over the given stores.
    pub fn new(
        catalog: B::Catalog,
        orders: B::Orders,
        users: B::Users,
        config: &Config,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let mailer = Mailer::new(transport, config.mail_from.clone());
        let notifier = EmailNotifier::new(users.clone(), mailer.clone());

        Self {
            accounts: AccountService::new(users).with_admin_emails(&config.admin_emails),
            products: ProductService::new(catalog.clone()),
            fulfillment: FulfillmentService::new(catalog, orders, notifier, config.retry_policy()),
            mailer,
        }
    }
}

/// Creates application state backed by in-memory stores.
pub fn create_memory_state(
    config: &Config,
    transport: Arc<dyn MailTransport>,
) -> Arc<AppState<MemoryBackend>> {
    Arc::new(AppState::new(
        InMemoryCatalogStore::new(),
        InMemoryOrderStore::new(),
        InMemoryUserStore::new(),
        config,
        transport,
    ))
}

/// Creates application state backed by PostgreSQL.
pub fn create_postgres_state(
    pool: PgPool,
    config: &Config,
    transport: Arc<dyn MailTransport>,
) -> Arc<AppState<PostgresBackend>> {
    Arc::new(AppState::new(
        PostgresCatalogStore::new(pool.clone()),
        PostgresOrderStore::new(pool.clone()),
        PostgresUserStore::new(pool),
        config,
        transport,
    ))
}
