pub mod catalog_repo;
pub use catalog_repo::{CatalogStore, PgCatalogRepository};
pub mod credit_repo;
pub use credit_repo::{CreditStore, PgCreditRepository};
pub mod finance_repo;
pub use finance_repo::{FinanceStore, PgFinanceRepository};
pub mod module_repo;
pub use module_repo::{ModuleStore, PgModuleRepository};
pub mod organization_repo;
pub use organization_repo::{OrganizationStore, PgOrganizationRepository};
pub mod user_repo;
pub use user_repo::{PgUserRepository, UserStore};
