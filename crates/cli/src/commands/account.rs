//! Sign-in, sign-out and session info.
//!
//! Signing in moves whatever the guest collected (cart, wishlist and saved
//! addresses) onto the account.

#![allow(clippy::print_stdout)]

use clap::{ArgGroup, Args};
use secrecy::SecretString;
use tracing::warn;

use bbqstyle_core::{MobileNumber, OtpCode};
use bbqstyle_storefront::models::{AccountName, TokenClaims};
use bbqstyle_storefront::services::{
    AddressBook, AuthError, AuthSession, CartService, OtpService, WishlistService,
};
use bbqstyle_storefront::{AppError, Storefront};

use super::CliError;
use super::cart::print_sync;
use super::prompt::Prompt;

#[derive(Args)]
#[command(group(ArgGroup::new("method").required(true).args(["email", "mobile"])))]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: Option<String>,

    /// Account password; asked for when not given
    #[arg(long, env = "BBQ_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Mobile number to verify with a one-time code
    #[arg(long)]
    pub mobile: Option<String>,
}

pub async fn login(state: &Storefront, args: LoginArgs) -> Result<(), CliError> {
    let auth = AuthSession::new(state);

    let claims = match (args.email, args.mobile) {
        (Some(email), _) => {
            let password = match args.password {
                Some(password) => password,
                None => Prompt::new().ask_required("Password:").await?,
            };
            let password = SecretString::from(password);
            auth.login(&email, &password).await.map_err(AppError::from)?
        }
        (None, Some(mobile)) => {
            let mobile = MobileNumber::parse(&mobile).map_err(AppError::from)?;
            login_with_otp(state, &mobile).await?
        }
        (None, None) => {
            return Err(AppError::BadRequest("Enter an email or a mobile number".into()).into());
        }
    };

    println!("Signed in as {}.", who(&claims));
    move_guest_data(state).await;
    Ok(())
}

async fn login_with_otp(state: &Storefront, mobile: &MobileNumber) -> Result<TokenClaims, CliError> {
    let otp = OtpService::new(state);
    let mut prompt = Prompt::new();

    otp.send(mobile).await.map_err(AppError::from)?;
    println!("Enter the OTP sent to {mobile}");
    loop {
        let answer = prompt.ask_required("OTP:").await?;
        let code = match OtpCode::parse(&answer) {
            Ok(code) => code,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if otp.verify(mobile, &code).await.map_err(AppError::from)? {
            break;
        }
        println!("Invalid or expired OTP");
    }

    let auth = AuthSession::new(state);
    match auth.login_with_mobile(mobile).await {
        Err(AuthError::UserNotFound) => {
            println!("No account uses this number yet, creating one.");
            let full_name = prompt.ask_required("Full name:").await?;
            let name = AccountName::from_full_name(&full_name);
            Ok(auth.register(&name, mobile).await.map_err(AppError::from)?)
        }
        other => Ok(other.map_err(AppError::from)?),
    }
}

/// Push the guest cart, wishlist and addresses to the account. Failures
/// leave the guest copies in place for the next sign-in.
async fn move_guest_data(state: &Storefront) {
    match CartService::new(state).sync_on_login().await {
        Ok(report) if !report.is_empty() => print_sync("Cart", &report),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Cart sync failed"),
    }
    match WishlistService::new(state).sync_on_login().await {
        Ok(report) if !report.is_empty() => print_sync("Wishlist", &report),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Wishlist sync failed"),
    }
    match AddressBook::new(state).migrate_local().await {
        Ok(migration) if !migration.mapping.is_empty() || migration.failed > 0 => println!(
            "Addresses: {} moved to your account, {} kept on this device.",
            migration.mapping.len(),
            migration.failed
        ),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Address migration failed"),
    }
}

pub fn logout(state: &Storefront) -> Result<(), CliError> {
    AuthSession::new(state).logout().map_err(AppError::from)?;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(state: &Storefront) -> Result<(), CliError> {
    let auth = AuthSession::new(state);
    let Some(claims) = auth.check().map_err(AppError::from)? else {
        println!("Not signed in. Browsing as a guest.");
        return Ok(());
    };
    println!("Signed in as {}.", who(&claims));
    if let Some(expires) = claims.expires_at() {
        println!("Session expires {}.", expires.format("%Y-%m-%d %H:%M UTC"));
    }
    let admin = auth.has_admin_session().await.map_err(AppError::from)?;
    println!("Admin session: {}", if admin { "yes" } else { "no" });
    Ok(())
}

fn who(claims: &TokenClaims) -> String {
    claims
        .email
        .clone()
        .or_else(|| claims.mobile.clone())
        .or_else(|| claims.user_id.map(|id| format!("user {id}")))
        .unwrap_or_else(|| "customer".to_owned())
}
