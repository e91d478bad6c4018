//! Create-user command handler

use crate::api::types::UserCreate;
use crate::config::Config;
use crate::db::Store;
use crate::entities::users::Role;
use crate::services::SeaOrmUserService;

pub async fn cmd_create_user(
    config: &Config,
    username: String,
    email: String,
    password: String,
    role: Role,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users = SeaOrmUserService::new(store, config.security.clone());

    let user = users
        .provision(UserCreate {
            username,
            email,
            password,
            role,
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create user: {e}"))?;

    println!("Created user '{}' (id {}, role {})", user.username, user.id, user.role);
    Ok(())
}
