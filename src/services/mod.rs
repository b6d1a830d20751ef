pub mod article_service;
pub mod backend_service;
pub mod upload_service;
