mod admin;
mod checkout;
mod helpers;
mod mocks;
mod webhooks;
