pub mod credentials;
pub mod loader;
pub mod resolver;
pub mod signer;

pub use credentials::{CredentialPolicy, CredentialsError, HmacKey, MetadataClient, StorageCredentials};
pub use loader::{ImageLoader, LabelStudioFiles, LoadError, is_remote};
pub use resolver::{ImageResolver, ResolveError, SIGNED_URL_TTL, Signing};
pub use signer::{ObjectStorageService, StorageError, UrlSigner};
