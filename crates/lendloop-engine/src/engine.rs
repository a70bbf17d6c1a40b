//! The lending engine facade
//!
//! Composes the member directory, ledger, catalog, rental desk, penalty book
//! and reputation book, and turns every state change into a notification.
//! Notifications are emitted after the underlying operation has returned,
//! so no store lock is held while a sink runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lendloop_catalog::{BrowseFilter, Catalog, Item, ItemDraft};
use lendloop_ledger::{Ledger, LedgerEntry};
use lendloop_notify::{Notification, NotificationKind, NotificationSink, TracingSink};
use lendloop_penalty::{Penalty, PenaltyBook, SettlementReport};
use lendloop_rental::{
    Activities, DeliveryOutcome, Rental, RentalDesk, RentalStatus, ReturnAssessor, ReturnOutcome,
};
use lendloop_reputation::{
    ComplaintDraft, ComplaintOutcome, FeedbackStatus, RentalView, ReputationBook,
    ReputationStats, Review,
};
use lendloop_types::{
    Actor, Clock, ComplaintId, DamageSeverity, DateRange, ItemId, LendError, PenaltyId,
    RentalId, Result, ReturnFacts, SystemClock, Tokens, UserId,
};

use crate::{EngineConfig, Member, MemberRegistry};

/// Browse criteria as a member enters them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowseQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    /// Matched against the owner's location, ignoring case
    pub location: Option<String>,
}

/// A member as shown on their profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub member: Member,
    pub balance: Tokens,
    pub reputation: ReputationStats,
    pub outstanding_penalties: Tokens,
}

/// Records penalties while the rental desk completes a return
struct PenaltyHook {
    book: PenaltyBook,
}

#[async_trait]
impl ReturnAssessor for PenaltyHook {
    async fn assess(&self, facts: &ReturnFacts) -> Result<Vec<PenaltyId>> {
        let created = self.book.record_return(facts).await?;
        Ok(created.into_iter().map(|p| p.id).collect())
    }
}

/// Builder for [`LendingEngine`]
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl EngineBuilder {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: None,
            sink: None,
        }
    }

    /// Use a specific time source (defaults to the system clock)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Send notifications here (defaults to the log)
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<LendingEngine> {
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let ledger = Ledger::new();
        let catalog = Catalog::new(self.config.catalog.clone(), clock.clone());
        let penalties = PenaltyBook::new(ledger.clone(), clock.clone());
        let rentals = RentalDesk::new(ledger.clone(), catalog.clone(), clock.clone())
            .with_assessor(Arc::new(PenaltyHook {
                book: penalties.clone(),
            }));
        let reputation = ReputationBook::new(self.config.reputation.clone(), clock.clone());

        Ok(LendingEngine {
            config: Arc::new(self.config),
            clock,
            sink,
            members: MemberRegistry::new(),
            ledger,
            catalog,
            rentals,
            penalties,
            reputation,
        })
    }
}

/// Entry point for every marketplace operation
///
/// Every mutating call takes the caller's [`Actor`] explicitly.
#[derive(Clone)]
pub struct LendingEngine {
    config: Arc<EngineConfig>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    members: MemberRegistry,
    ledger: Ledger,
    catalog: Catalog,
    rentals: RentalDesk,
    penalties: PenaltyBook,
    reputation: ReputationBook,
}

impl LendingEngine {
    /// Engine on the system clock, logging notifications
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rentals(&self) -> &RentalDesk {
        &self.rentals
    }

    pub fn penalties(&self) -> &PenaltyBook {
        &self.penalties
    }

    pub fn reputation(&self) -> &ReputationBook {
        &self.reputation
    }

    pub fn members(&self) -> &MemberRegistry {
        &self.members
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Register a member and credit the starting grant
    pub async fn register(&self, username: &str, location: &str) -> Result<Member> {
        let member = self
            .members
            .register(username, location, self.clock.now())
            .await?;
        if let Err(e) = self
            .ledger
            .open_account(&member.id, self.config.starting_grant())
            .await
        {
            self.members.forget(&member.id).await;
            return Err(e);
        }

        info!(user = %member.id, username = %member.username, "member registered");
        Ok(member)
    }

    pub async fn member(&self, id: &UserId) -> Result<Member> {
        self.members.get(id).await
    }

    pub async fn balance(&self, user: &UserId) -> Result<Tokens> {
        self.ledger.balance(user).await
    }

    /// Ledger history of a member, oldest first
    pub async fn statement(&self, user: &UserId) -> Vec<LedgerEntry> {
        self.ledger.account_entries(user).await
    }

    pub async fn profile(&self, user: &UserId) -> Result<Profile> {
        let member = self.members.get(user).await?;
        Ok(Profile {
            balance: self.ledger.balance(user).await?,
            reputation: self.reputation_of(user).await,
            outstanding_penalties: self.penalties.outstanding(user).await,
            member,
        })
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    pub async fn create_item(&self, actor: &Actor, draft: ItemDraft) -> Result<Item> {
        self.members.get(&actor.user).await?;
        self.reputation.ensure_not_banned(&actor.user).await?;
        self.catalog.create_item(actor, draft).await
    }

    pub async fn update_item(&self, actor: &Actor, id: &ItemId, draft: ItemDraft) -> Result<Item> {
        self.catalog.update_item(actor, id, draft).await
    }

    /// Delete an item; refused while it has active rentals
    pub async fn delete_item(&self, actor: &Actor, id: &ItemId) -> Result<Item> {
        self.rentals.retire_item(actor, id).await
    }

    pub async fn toggle_availability(&self, actor: &Actor, id: &ItemId) -> Result<bool> {
        self.catalog.toggle_availability(actor, id).await
    }

    pub async fn item(&self, id: &ItemId) -> Result<Item> {
        self.catalog.get(id).await
    }

    pub async fn items_of(&self, owner: &UserId) -> Vec<Item> {
        self.catalog.items_of(owner).await
    }

    /// Enabled items matching the query, newest first
    pub async fn browse(&self, query: &BrowseQuery) -> Vec<Item> {
        let owners = match &query.location {
            Some(location) if !location.trim().is_empty() => {
                Some(self.members.in_location(location).await)
            }
            _ => None,
        };
        let filter = BrowseFilter {
            category: query.category.clone(),
            search: query.search.clone().filter(|s| !s.trim().is_empty()),
            owners,
        };
        self.catalog.browse(&filter).await
    }

    pub fn categories(&self) -> Vec<String> {
        self.catalog.categories()
    }

    pub fn suggest_daily_tokens(&self, value: u64, category: &str) -> Tokens {
        self.catalog.suggest_daily_tokens(value, category)
    }

    // ========================================================================
    // Rentals
    // ========================================================================

    /// Ask to borrow an item for the inclusive range `start..=end`
    pub async fn request_rental(
        &self,
        actor: &Actor,
        item_id: &ItemId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Rental> {
        self.reputation.ensure_not_banned(&actor.user).await?;
        let range = DateRange::new(start, end)?;
        let rental = self.rentals.request(actor, item_id, range).await?;

        self.notify(
            Notification::new(
                NotificationKind::RentalRequested,
                rental.owner,
                "New borrow request",
                format!(
                    "{} wants to borrow {} for {} day(s), {}",
                    self.display_name(&rental.borrower).await,
                    rental.item_title,
                    rental.days,
                    rental.total_tokens
                ),
            )
            .about(rental.id),
        )
        .await;
        Ok(rental)
    }

    /// Owner approves; the fee moves from borrower to owner
    pub async fn approve(&self, actor: &Actor, id: &RentalId) -> Result<Rental> {
        match self.rentals.approve(actor, id).await {
            Ok(rental) => {
                self.notify(
                    Notification::new(
                        NotificationKind::RequestApproved,
                        rental.borrower,
                        "Request approved",
                        format!("{} paid for {}", rental.total_tokens, rental.item_title),
                    )
                    .about(rental.id),
                )
                .await;
                Ok(rental)
            }
            Err(e @ LendError::InsufficientTokens { .. }) => {
                if let Ok(rental) = self.rentals.get(id).await {
                    if rental.status == RentalStatus::Rejected {
                        self.notify(
                            Notification::new(
                                NotificationKind::RequestRejected,
                                rental.borrower,
                                "Request rejected",
                                format!(
                                    "Not enough tokens to pay {} for {}",
                                    rental.total_tokens, rental.item_title
                                ),
                            )
                            .about(rental.id),
                        )
                        .await;
                    }
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn reject(&self, actor: &Actor, id: &RentalId) -> Result<Rental> {
        let rental = self.rentals.reject(actor, id).await?;
        self.notify(
            Notification::new(
                NotificationKind::RequestRejected,
                rental.borrower,
                "Request rejected",
                format!("Your request for {} was declined", rental.item_title),
            )
            .about(rental.id),
        )
        .await;
        Ok(rental)
    }

    pub async fn cancel(&self, actor: &Actor, id: &RentalId) -> Result<Rental> {
        let before = self.rentals.get(id).await?;
        let rental = self.rentals.cancel(actor, id).await?;

        if let Some(other) = rental.counterparty_of(&actor.user) {
            let message = if before.status == RentalStatus::Approved {
                format!("{} cancelled, {} refunded", rental.item_title, rental.total_tokens)
            } else {
                format!("{} cancelled", rental.item_title)
            };
            self.notify(
                Notification::new(
                    NotificationKind::RentalCancelled,
                    other,
                    "Rental cancelled",
                    message,
                )
                .about(rental.id),
            )
            .await;
        }
        Ok(rental)
    }

    pub async fn confirm_delivery(&self, actor: &Actor, id: &RentalId) -> Result<DeliveryOutcome> {
        let outcome = self.rentals.confirm_delivery(actor, id).await?;
        let rental = &outcome.rental;

        if outcome.delivered {
            for user in [rental.owner, rental.borrower] {
                self.notify(
                    Notification::new(
                        NotificationKind::Delivered,
                        user,
                        "Item delivered",
                        format!("Both parties confirmed the handover of {}", rental.item_title),
                    )
                    .about(rental.id),
                )
                .await;
            }
        } else if outcome.newly_confirmed {
            if let Some(other) = rental.counterparty_of(&actor.user) {
                self.notify(
                    Notification::new(
                        NotificationKind::DeliveryConfirmed,
                        other,
                        "Delivery confirmed",
                        format!("Please confirm the handover of {}", rental.item_title),
                    )
                    .about(rental.id),
                )
                .await;
            }
        }
        Ok(outcome)
    }

    /// Confirm the item came back; only the owner may report damage
    pub async fn confirm_return(
        &self,
        actor: &Actor,
        id: &RentalId,
        damage: Option<DamageSeverity>,
    ) -> Result<ReturnOutcome> {
        let outcome = self.rentals.confirm_return(actor, id, damage).await?;
        let rental = &outcome.rental;

        if outcome.completed {
            for user in [rental.owner, rental.borrower] {
                self.notify(
                    Notification::new(
                        NotificationKind::RentalCompleted,
                        user,
                        "Rental completed",
                        format!("{} is back with its owner", rental.item_title),
                    )
                    .about(rental.id),
                )
                .await;
                self.notify(
                    Notification::new(
                        NotificationKind::FeedbackRequired,
                        user,
                        "Leave a review",
                        "Rate the other party to finish this rental",
                    )
                    .about(rental.id),
                )
                .await;
            }
            for penalty_id in &outcome.penalties {
                if let Ok(penalty) = self.penalties.get(penalty_id).await {
                    self.notify_penalty_created(&penalty, &rental.item_title).await;
                }
            }
        } else if outcome.newly_confirmed {
            if let Some(other) = rental.counterparty_of(&actor.user) {
                self.notify(
                    Notification::new(
                        NotificationKind::ReturnConfirmed,
                        other,
                        "Return confirmed",
                        format!("Please confirm the return of {}", rental.item_title),
                    )
                    .about(rental.id),
                )
                .await;
            }
        }
        Ok(outcome)
    }

    pub async fn rental(&self, id: &RentalId) -> Result<Rental> {
        self.rentals.get(id).await
    }

    pub async fn pending_requests(&self, owner: &UserId) -> Vec<Rental> {
        self.rentals.pending_for_owner(owner).await
    }

    pub async fn activities(&self, user: &UserId) -> Activities {
        self.rentals.activities(user).await
    }

    pub async fn chat_eligible(&self, user: &UserId) -> Vec<Rental> {
        self.rentals.chat_eligible(user).await
    }

    pub async fn active_rentals_for_item(&self, item_id: &ItemId) -> Vec<Rental> {
        self.rentals.active_for_item(item_id).await
    }

    // ========================================================================
    // Penalties
    // ========================================================================

    /// Pay what the caller can toward their own unpaid penalties
    pub async fn process_pending_penalties(&self, actor: &Actor) -> Result<SettlementReport> {
        let report = self.penalties.process_pending(&actor.user).await?;
        self.notify_settlement(&report).await;
        Ok(report)
    }

    /// Settle every member who owes something
    pub async fn sweep_penalties(&self) -> Vec<SettlementReport> {
        let reports = self.penalties.sweep().await;
        for report in &reports {
            self.notify_settlement(report).await;
        }
        reports
    }

    pub async fn penalties_of(&self, user: &UserId) -> Vec<Penalty> {
        self.penalties.of_user(user).await
    }

    pub async fn penalties_for_rental(&self, rental_id: &RentalId) -> Vec<Penalty> {
        self.penalties.of_rental(rental_id).await
    }

    // ========================================================================
    // Reputation
    // ========================================================================

    /// Review the other party of a completed rental
    pub async fn submit_review(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        rated: UserId,
        stars: u8,
        comment: Option<String>,
    ) -> Result<Review> {
        let rental = self.rentals.get(rental_id).await?;
        let review = self
            .reputation
            .submit_review(actor, &view_of(&rental), rated, stars, comment)
            .await?;

        self.notify(
            Notification::new(
                NotificationKind::ReviewReceived,
                rated,
                "New review",
                format!("You received {} star(s) for {}", stars, rental.item_title),
            )
            .about(rental.id),
        )
        .await;
        Ok(review)
    }

    pub async fn feedback_required(&self, rental_id: &RentalId, user: &UserId) -> Result<bool> {
        let rental = self.rentals.get(rental_id).await?;
        Ok(self.reputation.feedback_required(&view_of(&rental), user).await)
    }

    pub async fn feedback_status(&self, rental_id: &RentalId) -> Result<FeedbackStatus> {
        let rental = self.rentals.get(rental_id).await?;
        Ok(self.reputation.feedback_status(&view_of(&rental)).await)
    }

    pub async fn file_complaint(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        draft: ComplaintDraft,
    ) -> Result<ComplaintOutcome> {
        let rental = self.rentals.get(rental_id).await?;
        let outcome = self
            .reputation
            .file_complaint(actor, &view_of(&rental), draft)
            .await?;

        let complaint = &outcome.complaint;
        self.notify(
            Notification::new(
                NotificationKind::ComplaintFiled,
                complaint.accused,
                "Complaint filed against you",
                format!("A {} complaint was filed about {}", complaint.kind, rental.item_title),
            )
            .about(complaint.id),
        )
        .await;
        if complaint.is_valid() {
            self.notify_complaint_resolution(&outcome).await;
        }
        Ok(outcome)
    }

    /// Resolve a pending complaint as valid or dismissed
    pub async fn adjudicate_complaint(&self, id: &ComplaintId, valid: bool) -> Result<ComplaintOutcome> {
        let outcome = self.reputation.adjudicate(id, valid).await?;
        self.notify_complaint_resolution(&outcome).await;
        Ok(outcome)
    }

    pub async fn reputation_of(&self, user: &UserId) -> ReputationStats {
        let views: Vec<RentalView> = self
            .rentals
            .rentals_of(user)
            .await
            .iter()
            .map(view_of)
            .collect();
        self.reputation.stats(user, &views).await
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    async fn notify(&self, notification: Notification) {
        let notification = notification.at(self.clock.now());
        self.sink.emit(notification).await;
    }

    async fn display_name(&self, user: &UserId) -> String {
        self.members
            .get(user)
            .await
            .map(|m| m.username)
            .unwrap_or_else(|_| user.to_string())
    }

    async fn notify_penalty_created(&self, penalty: &Penalty, item_title: &str) {
        self.notify(
            Notification::new(
                NotificationKind::PenaltyCreated,
                penalty.liable,
                "Penalty charged",
                format!("{} owed for {} ({})", penalty.amount, item_title, penalty.reason),
            )
            .about(penalty.id),
        )
        .await;
        self.notify(
            Notification::new(
                NotificationKind::PenaltyCreated,
                penalty.beneficiary,
                "Penalty recorded",
                format!("{} will be collected for {} ({})", penalty.amount, item_title, penalty.reason),
            )
            .about(penalty.id),
        )
        .await;
    }

    async fn notify_settlement(&self, report: &SettlementReport) {
        for payment in &report.payments {
            let (kind, title) = if payment.cleared {
                (NotificationKind::PenaltyPaid, "Penalty paid")
            } else {
                (NotificationKind::PenaltyPartiallyPaid, "Penalty partially paid")
            };
            for user in [report.user, payment.beneficiary] {
                self.notify(
                    Notification::new(kind, user, title, format!("{} collected", payment.amount))
                        .about(payment.penalty_id),
                )
                .await;
            }
        }
    }

    async fn notify_complaint_resolution(&self, outcome: &ComplaintOutcome) {
        let complaint = &outcome.complaint;
        let (kind, title) = if complaint.is_valid() {
            (NotificationKind::ComplaintValidated, "Complaint upheld")
        } else {
            (NotificationKind::ComplaintDismissed, "Complaint dismissed")
        };
        for user in [complaint.accused, complaint.complainant] {
            self.notify(
                Notification::new(kind, user, title, format!("Complaint {} is {}", complaint.id, complaint.status))
                    .about(complaint.id),
            )
            .await;
        }
        if outcome.banned_now {
            warn!(user = %complaint.accused, "member banned");
            self.notify(
                Notification::new(
                    NotificationKind::UserBanned,
                    complaint.accused,
                    "Account banned",
                    "Too many valid complaints; you can no longer borrow or list items",
                )
                .about(complaint.accused),
            )
            .await;
        }
    }
}

fn view_of(rental: &Rental) -> RentalView {
    RentalView {
        rental_id: rental.id,
        owner: rental.owner,
        borrower: rental.borrower,
        completed: rental.status == RentalStatus::Completed,
    }
}
