pub mod extract_weights;
pub mod generate_config;
pub mod inspect;

pub use self::extract_weights::extract_weights;
pub use self::generate_config::generate_config;
pub use self::inspect::inspect;
