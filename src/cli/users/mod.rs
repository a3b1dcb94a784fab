//! User commands - account administration against the PostgreSQL store

use std::sync::Arc;

use clap::{ArgAction, Args, Subcommand};

use crate::config::AppConfig;
use crate::domain::user::{User, UserId, UserStore};
use crate::infrastructure::user::{
    hasher_from_config, CreateUserRequest, PasswordHasher, PostgresUserStore, UserService,
};

type CliUserService = UserService<dyn UserStore, dyn PasswordHasher>;

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a new, enabled user
    Create(CreateArgs),

    /// Print a user as JSON
    Show {
        id: i64,
    },

    /// Change a user's password after checking the current one
    ChangePassword {
        id: i64,
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },

    /// Grant or revoke the administrative flag
    SetAdmin {
        id: i64,
        #[arg(action = ArgAction::Set)]
        admin: bool,
    },

    /// Enable or disable a user
    SetEnabled {
        id: i64,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
        /// The user's current password, required unless the status update
        /// policy is `unchecked`
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "CREDENTIAL_PASSWORD", hide_env_values = true)]
    pub password: String,
    #[arg(long)]
    pub admin: bool,
    /// Require the user to change their password on next login
    #[arg(long)]
    pub force_reset: bool,
}

impl From<CreateArgs> for CreateUserRequest {
    fn from(args: CreateArgs) -> Self {
        CreateUserRequest::new(args.username, args.email, args.password)
            .with_admin(args.admin)
            .with_forced_password_reset(args.force_reset)
    }
}

/// Build the service the way the CLI runs it
pub fn build_service(config: &AppConfig, store: Arc<dyn UserStore>) -> CliUserService {
    UserService::new(store, hasher_from_config(&config.auth))
        .with_status_update_policy(config.auth.status_update_policy)
}

pub async fn run(command: UserCommand) -> anyhow::Result<()> {
    let (config, pool) = super::bootstrap().await?;
    let store: Arc<dyn UserStore> = Arc::new(PostgresUserStore::new(pool.clone()));
    let service = build_service(&config, store);

    let result = execute(&service, command).await;
    pool.close().await;

    if let Some(user) = result? {
        println!("{}", serde_json::to_string_pretty(&user)?);
    }

    Ok(())
}

/// Run one command, returning the user to print when there is one
async fn execute(service: &CliUserService, command: UserCommand) -> anyhow::Result<Option<User>> {
    let user = match command {
        UserCommand::Create(args) => service.create_user(args.into()).await?,
        UserCommand::Show { id } => service.get_user(UserId::new(id)?).await?,
        UserCommand::ChangePassword { id, old, new } => {
            service.change_password(UserId::new(id)?, &old, &new).await?;
            return Ok(None);
        }
        UserCommand::SetAdmin { id, admin } => {
            let id = UserId::new(id)?;
            service.update_admin_role(id, admin).await?;
            service.get_user(id).await?
        }
        UserCommand::SetEnabled {
            id,
            enabled,
            password,
        } => {
            let id = UserId::new(id)?;
            service
                .update_user_status(id, password.as_deref(), enabled)
                .await?;
            service.get_user(id).await?
        }
    };

    Ok(Some(user))
}
