pub mod manifest;
pub mod manifest_item;
pub mod upload;

pub use manifest::Entity as Manifest;
pub use manifest_item::Entity as ManifestItem;
pub use upload::Entity as Upload;
