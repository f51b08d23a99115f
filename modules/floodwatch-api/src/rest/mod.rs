pub mod floods;

pub use floods::api_floods;
