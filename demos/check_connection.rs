//! Checks whether a BOOP user's stored Instagram credential still works, refreshing it when it is
//! close to expiry.
//!
//! Platform settings come from the `INSTAGRAM_*` environment variables. Credentials are read from
//! the JSON snapshot at `BOOP_CREDENTIALS_PATH` (default `boop-credentials.json`) and the user
//! from `BOOP_USER_ID` (default `u1`).

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
// self
use boop_instagram::{
	auth::UserId, config::PlatformConfig, flows::ReqwestTokenManager, store::FileStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let path = env::var("BOOP_CREDENTIALS_PATH").unwrap_or_else(|_| "boop-credentials.json".into());
	let store = Arc::new(FileStore::open(path)?);
	let user_id = UserId::new(env::var("BOOP_USER_ID").unwrap_or_else(|_| "u1".into()))?;
	let manager = ReqwestTokenManager::new(store.clone(), PlatformConfig::from_env()?);
	let stored = manager.stored_status(&user_id).await?;

	println!("Reading credentials from {}.", store.path().display());

	if !stored.is_connected {
		let login = manager.start_authorization(user_id)?;

		println!("No credential stored. Send the user to {}.", login.authorize_url);

		return Ok(());
	}

	let status = manager.check_connection(&user_id).await;

	match (&status.profile, &status.error) {
		(Some(profile), _) => println!(
			"Connected as {} ({}).",
			profile.username.as_deref().unwrap_or("unknown"),
			profile.id
		),
		(None, Some(error)) => eprintln!("Not connected: {error}."),
		(None, None) => eprintln!("Not connected."),
	}

	if status.needs_reauth {
		let login = manager.start_authorization(user_id)?;

		println!("Reauthorization required. Send the user to {}.", login.authorize_url);
	}

	Ok(())
}
