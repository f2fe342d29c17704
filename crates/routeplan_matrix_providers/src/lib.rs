mod as_the_crow_flies;
pub mod cache;
pub mod error;
pub mod graphhopper_api;
pub mod travel_matrices;
pub mod travel_matrix_client;
pub mod travel_matrix_provider;

pub use as_the_crow_flies::as_the_crow_flies_matrices;
pub use cache::{MatricesCache, MemoryCache, MemoryCacheParams, NoCache};
pub use error::MatrixProviderError;
pub use travel_matrices::{TravelMatrices, UNREACHABLE};
pub use travel_matrix_client::{MatrixProvider, TravelMatrixClient};
pub use travel_matrix_provider::TravelMatrixProvider;
