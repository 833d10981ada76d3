//! Operator console walkthrough: boots the ledger, runs a short session and
//! prints the account table the way the server console shows it.

use remote_ledger::utils::{parse_amount, validate_transfer_request, RecordingSubscriber};
use remote_ledger::{logging, JsonFileStore, LedgerConfig, LedgerService, LoginOutcome};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LedgerConfig::from_env()?;
    logging::init(config.log_format);

    let store = JsonFileStore::new(config.store_path.clone());
    let ledger = LedgerService::open_with(
        store,
        &config,
        Arc::new(remote_ledger::TracingOperatorLog),
    )
    .await;

    let session = match ledger.authenticate("01234", "1234").await {
        LoginOutcome::Authenticated(summary) => summary,
        other => return Err(format!("login failed: {:?}", other).into()),
    };
    println!(
        "Logged in as {} ({}), balance {}",
        session.account_name, session.account_number, session.balance
    );

    let inbox = RecordingSubscriber::new();
    ledger
        .register_callback(&session.account_number, Arc::new(inbox.clone()))
        .await;

    let deposit = parse_amount("500")?;
    println!("deposit 500: {:?}", ledger.deposit(&session.account_number, &deposit).await);

    let transfer = parse_amount("2000")?;
    let known_balance = ledger
        .balance(&session.account_number)
        .await
        .unwrap_or_default();
    validate_transfer_request(&session.account_number, "12345", &transfer, &known_balance)?;
    println!(
        "transfer 2000 to 12345: {:?}",
        ledger
            .transfer(&session.account_number, "12345", &transfer)
            .await
    );

    let overdraft = parse_amount("99999")?;
    println!(
        "withdraw 99999: {:?}",
        ledger.withdraw(&session.account_number, &overdraft).await
    );

    for message in inbox.messages() {
        println!("  notification: {}", message);
    }
    ledger.unregister_callback(&session.account_number).await;

    println!();
    println!("{:<10} {:<20} {:>12}", "Account", "Name", "Balance");
    for account in ledger.accounts().await {
        println!(
            "{:<10} {:<20} {:>12}",
            account.account_number, account.account_name, account.balance
        );
    }
    println!("Store: {}", ledger.store().path().display());

    Ok(())
}
