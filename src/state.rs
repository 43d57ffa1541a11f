use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::JwtConfig,
    services::{mail_service::Mailer, upload_service::ImageStore},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: Arc<DatabaseConnection>,
    pub jwt: JwtConfig,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn db(&self) -> &DatabaseConnection {
        &self.orm
    }
}
