//! Demo marketplace
//!
//! The engine keeps everything in memory, so a fresh sweeper has nothing to
//! collect. `--demo` seeds one damaged return the borrower cannot fully pay
//! for, which the sweeper then settles over successive sweeps.

use chrono::{Duration, Utc};

use lendloop_engine::{Actor, DamageSeverity, DateRange, ItemDraft, LendingEngine, Tokens};

pub async fn seed(engine: &LendingEngine) -> anyhow::Result<()> {
    let owner = engine.register("demo-owner", "Lisbon").await?;
    let borrower = engine.register("demo-borrower", "Lisbon").await?;
    let (owner, borrower) = (Actor::new(owner.id), Actor::new(borrower.id));

    let today = Utc::now().date_naive();
    let category = engine
        .categories()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no categories configured"))?;
    let value = 1_000;
    let item = engine
        .create_item(
            &owner,
            ItemDraft {
                title: "Camping tent".to_string(),
                description: "Four-person dome tent".to_string(),
                daily_price: engine.suggest_daily_tokens(value, &category),
                category,
                value,
                images: vec!["tent.jpg".to_string()],
                availability: DateRange::new(today, today + Duration::days(30))?,
            },
        )
        .await?;

    let rental = engine
        .request_rental(&borrower, &item.id, today, today)
        .await?;
    engine.approve(&owner, &rental.id).await?;
    engine.confirm_delivery(&owner, &rental.id).await?;
    engine.confirm_delivery(&borrower, &rental.id).await?;
    engine
        .confirm_return(&owner, &rental.id, Some(DamageSeverity::Light))
        .await?;
    engine.confirm_return(&borrower, &rental.id, None).await?;

    let owed = engine.profile(&borrower.user).await?.outstanding_penalties;
    tracing::info!(
        rental_id = %rental.id,
        %owed,
        balance = %engine.balance(&borrower.user).await?,
        "demo marketplace seeded"
    );
    if owed == Tokens::ZERO {
        tracing::warn!("demo return produced no penalty");
    }
    Ok(())
}
