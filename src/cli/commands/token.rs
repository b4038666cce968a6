use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(help = "Username")]
    pub username: String,

    #[arg(long, help = "User id (random when omitted)")]
    pub user_id: Option<Uuid>,

    #[arg(long, help = "Grant admin rights")]
    pub admin: bool,

    #[arg(long = "permission", short = 'p', help = "Permission to grant, repeatable")]
    pub permissions: Vec<String>,
}

pub fn handle(config: &AppConfig, args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let user_id = args.user_id.unwrap_or_else(Uuid::new_v4);
    let claims = Claims::new(
        &config.security,
        user_id,
        args.username,
        args.admin,
        args.permissions,
    );
    let token = generate_jwt(&config.security, &claims)?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Token issued",
            Some(json!({
                "token": token,
                "user_id": claims.sub,
                "expires_at": claims.exp,
                "cookie": config.security.session_cookie,
            })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
