pub mod credential_store;
pub mod oauth;

pub use credential_store::{CredentialStore, FileCredentialStore, StoredCredential};
pub use oauth::{AuthError, GmailAuthenticator};
