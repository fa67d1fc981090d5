pub mod field_list_service;
pub mod option_tree_service;

pub use field_list_service::FieldListService;
pub use option_tree_service::{OptionTreeService, PairChange};

pub use crate::errors::{FormError as ServiceError, FormResult as ServiceResult};
