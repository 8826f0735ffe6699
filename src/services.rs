pub mod auth;
pub use auth::AuthService;
pub mod credits;
pub use credits::CreditLedgerService;
pub mod lifecycle;
pub use lifecycle::OrganizationLifecycleService;
pub mod payment;
pub use payment::{PaymentGateway, StripeGateway};
pub mod provisioning;
pub use provisioning::ModuleProvisioningService;

#[cfg(test)]
pub mod test_support;
