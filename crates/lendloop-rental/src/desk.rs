//! The rental desk: every state transition of every rental
//!
//! All rentals live behind one write lock. Each operation validates and
//! mutates inside a single critical section, so two callers racing on the
//! same item or the same rental are serialized. Ledger transfers happen
//! inside that section too; a failed transfer leaves the rental untouched.
//!
//! Lock order: rentals, then penalties (through the return assessor), then
//! the ledger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use lendloop_catalog::{Catalog, Item};
use lendloop_ledger::{EntryReason, Ledger};
use lendloop_types::{
    Actor, Clock, DamageSeverity, DateRange, ItemId, LendError, Party, PenaltyId, RentalId,
    Result, ReturnFacts, UserId,
};

use crate::{ConfirmationSet, Rental, RentalAction, RentalStatus, StatusChange};

/// Turns a completed return into penalties
///
/// Called while the rental is still locked, so the return, its assessment
/// and completion form one step. An error aborts the return.
#[async_trait]
pub trait ReturnAssessor: Send + Sync {
    async fn assess(&self, facts: &ReturnFacts) -> Result<Vec<PenaltyId>>;
}

/// Result of a delivery confirmation
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub rental: Rental,
    /// False when the party had already confirmed
    pub newly_confirmed: bool,
    /// This confirmation completed the handover
    pub delivered: bool,
}

/// Result of a return confirmation
#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub rental: Rental,
    pub newly_confirmed: bool,
    /// This confirmation completed the rental
    pub completed: bool,
    /// Penalties assessed on completion
    pub penalties: Vec<PenaltyId>,
    /// Both parties now owe a review
    pub feedback_required: bool,
}

/// A member's rentals, split by role
#[derive(Debug, Clone, Default)]
pub struct Activities {
    pub as_borrower: Vec<Rental>,
    pub as_owner: Vec<Rental>,
}

/// Owns every rental and its transitions
#[derive(Clone)]
pub struct RentalDesk {
    rentals: Arc<RwLock<HashMap<RentalId, Rental>>>,
    ledger: Ledger,
    catalog: Catalog,
    clock: Arc<dyn Clock>,
    assessor: Option<Arc<dyn ReturnAssessor>>,
}

impl RentalDesk {
    pub fn new(ledger: Ledger, catalog: Catalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            rentals: Arc::new(RwLock::new(HashMap::new())),
            ledger,
            catalog,
            clock,
            assessor: None,
        }
    }

    pub fn with_assessor(mut self, assessor: Arc<dyn ReturnAssessor>) -> Self {
        self.assessor = Some(assessor);
        self
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Ask to borrow an item for `range`; no tokens move yet
    pub async fn request(&self, actor: &Actor, item_id: &ItemId, range: DateRange) -> Result<Rental> {
        let borrower = actor.user;
        let mut rentals = self.rentals.write().await;
        let item = self.catalog.get(item_id).await?;

        if item.owner == borrower {
            return Err(LendError::validation("item_id", "cannot borrow your own item"));
        }
        let today = self.clock.today();
        if range.start() < today {
            return Err(LendError::validation(
                "start",
                format!("{} is before today ({})", range.start(), today),
            ));
        }
        item.check_bookable(&range)?;
        check_no_overlap(&rentals, &item, &range, None)?;

        let days = range.days();
        let total_tokens = item
            .daily_price
            .checked_mul(days)
            .ok_or_else(|| LendError::validation("range", "rental cost overflows"))?;
        if total_tokens.is_zero() {
            return Err(LendError::validation("range", "rental must cost at least one token"));
        }
        let balance = self.ledger.balance(&borrower).await?;
        if balance < total_tokens {
            return Err(LendError::InsufficientTokens {
                user: borrower.to_string(),
                required: total_tokens.value(),
                available: balance.value(),
            });
        }

        let now = self.clock.now();
        let rental = Rental {
            id: RentalId::new(),
            item_id: item.id,
            item_title: item.title.clone(),
            owner: item.owner,
            borrower,
            range,
            days,
            daily_price: item.daily_price,
            item_value: item.value,
            total_tokens,
            status: RentalStatus::Pending,
            delivery: ConfirmationSet::default(),
            return_confirmation: ConfirmationSet::default(),
            damage: DamageSeverity::None,
            returned_at: None,
            penalties: Vec::new(),
            version: 1,
            history: vec![StatusChange {
                from: None,
                to: RentalStatus::Pending,
                by: borrower,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        };
        rentals.insert(rental.id, rental.clone());

        info!(
            rental_id = %rental.id,
            item_id = %rental.item_id,
            %borrower,
            total = %rental.total_tokens,
            "rental requested"
        );
        Ok(rental)
    }

    /// Owner accepts a pending request and the rental fee moves
    ///
    /// If the borrower can no longer pay, the request is rejected and
    /// `InsufficientTokens` is returned.
    pub async fn approve(&self, actor: &Actor, id: &RentalId) -> Result<Rental> {
        let mut rentals = self.rentals.write().await;
        let current = rentals
            .get(id)
            .ok_or_else(|| LendError::not_found("rental", id))?;
        current.require_owner(&actor.user)?;
        actor.check_version(id, current.version)?;
        let next = current.next_status(RentalAction::Approve)?;

        let item = self.catalog.get(&current.item_id).await?;
        check_no_overlap(&rentals, &item, &current.range, Some(id))?;

        let (borrower, owner, total) = (current.borrower, current.owner, current.total_tokens);
        let now = self.clock.now();
        let paid = self
            .ledger
            .transfer(&borrower, &owner, total, EntryReason::RentalPayment { rental_id: *id })
            .await;

        let rental = rentals
            .get_mut(id)
            .ok_or_else(|| LendError::not_found("rental", id))?;

        match paid {
            Ok(_) => rental.advance(next, actor.user, now),
            Err(LendError::InsufficientFunds { available, .. }) => {
                rental.advance(RentalStatus::Rejected, actor.user, now);
                warn!(rental_id = %id, %borrower, required = %total, available, "approval failed, request rejected");
                return Err(LendError::InsufficientTokens {
                    user: borrower.to_string(),
                    required: total.value(),
                    available,
                });
            }
            Err(e) => return Err(e),
        }

        info!(rental_id = %id, %borrower, %owner, amount = %total, "rental approved");
        Ok(rental.clone())
    }

    /// Owner declines a pending request
    pub async fn reject(&self, actor: &Actor, id: &RentalId) -> Result<Rental> {
        let mut rentals = self.rentals.write().await;
        let rental = rentals
            .get_mut(id)
            .ok_or_else(|| LendError::not_found("rental", id))?;
        rental.require_owner(&actor.user)?;
        actor.check_version(id, rental.version)?;
        let next = rental.next_status(RentalAction::Reject)?;

        rental.advance(next, actor.user, self.clock.now());
        info!(rental_id = %id, "rental rejected");
        Ok(rental.clone())
    }

    /// Withdraw before delivery
    ///
    /// A pending request can only be withdrawn by its borrower. An approved
    /// rental can be cancelled by either party and the fee goes back to the
    /// borrower.
    pub async fn cancel(&self, actor: &Actor, id: &RentalId) -> Result<Rental> {
        let mut rentals = self.rentals.write().await;
        let rental = rentals
            .get_mut(id)
            .ok_or_else(|| LendError::not_found("rental", id))?;
        let party = rental.party_of(&actor.user)?;
        actor.check_version(id, rental.version)?;
        let next = rental.next_status(RentalAction::Cancel)?;

        match rental.status {
            RentalStatus::Pending if party == Party::Owner => {
                return Err(LendError::not_authorized(
                    "the owner rejects a pending request rather than cancelling it",
                ));
            }
            RentalStatus::Approved => {
                self.ledger
                    .transfer(
                        &rental.owner,
                        &rental.borrower,
                        rental.total_tokens,
                        EntryReason::RentalRefund { rental_id: *id },
                    )
                    .await?;
                debug!(rental_id = %id, amount = %rental.total_tokens, "rental fee refunded");
            }
            _ => {}
        }

        rental.advance(next, actor.user, self.clock.now());
        info!(rental_id = %id, by = %party, "rental cancelled");
        Ok(rental.clone())
    }

    /// One party confirms the handover; both together make it delivered
    pub async fn confirm_delivery(&self, actor: &Actor, id: &RentalId) -> Result<DeliveryOutcome> {
        let mut rentals = self.rentals.write().await;
        let rental = rentals
            .get_mut(id)
            .ok_or_else(|| LendError::not_found("rental", id))?;
        let party = rental.party_of(&actor.user)?;

        if rental.delivery.has(party) {
            return Ok(DeliveryOutcome {
                rental: rental.clone(),
                newly_confirmed: false,
                delivered: false,
            });
        }
        actor.check_version(id, rental.version)?;
        let next = rental.next_status(RentalAction::Deliver)?;

        let now = self.clock.now();
        rental.delivery.confirm(party);
        let delivered = rental.delivery.is_complete();
        if delivered {
            rental.advance(next, actor.user, now);
            info!(rental_id = %id, "rental delivered");
        } else {
            rental.touch(now);
            debug!(rental_id = %id, %party, "delivery confirmed");
        }

        Ok(DeliveryOutcome {
            rental: rental.clone(),
            newly_confirmed: true,
            delivered,
        })
    }

    /// One party confirms the item came back
    ///
    /// Only the owner may report damage. The second confirmation passes the
    /// rental through `returned`, assesses penalties against the clock's
    /// current date and completes it.
    pub async fn confirm_return(
        &self,
        actor: &Actor,
        id: &RentalId,
        damage: Option<DamageSeverity>,
    ) -> Result<ReturnOutcome> {
        let mut rentals = self.rentals.write().await;
        let rental = rentals
            .get_mut(id)
            .ok_or_else(|| LendError::not_found("rental", id))?;
        let party = rental.party_of(&actor.user)?;

        if party == Party::Borrower && damage.map_or(false, |d| d.is_damaged()) {
            return Err(LendError::validation(
                "damage",
                "only the owner may report damage",
            ));
        }
        if rental.return_confirmation.has(party) {
            return Ok(ReturnOutcome {
                rental: rental.clone(),
                newly_confirmed: false,
                completed: false,
                penalties: Vec::new(),
                feedback_required: false,
            });
        }
        actor.check_version(id, rental.version)?;
        let returned = rental.next_status(RentalAction::Return)?;

        let reported = match party {
            Party::Owner => damage.unwrap_or_default(),
            Party::Borrower => rental.damage,
        };
        let now = self.clock.now();

        if !rental.return_confirmation.has(party.counterparty()) {
            rental.return_confirmation.confirm(party);
            rental.damage = reported;
            rental.touch(now);
            debug!(rental_id = %id, %party, "return confirmed");
            return Ok(ReturnOutcome {
                rental: rental.clone(),
                newly_confirmed: true,
                completed: false,
                penalties: Vec::new(),
                feedback_required: false,
            });
        }

        let facts = ReturnFacts {
            rental_id: rental.id,
            item_id: rental.item_id,
            borrower: rental.borrower,
            owner: rental.owner,
            daily_price: rental.daily_price,
            item_value: rental.item_value,
            agreed_end: rental.range.end(),
            returned_on: now.date_naive(),
            damage: reported,
        };
        let penalties = match &self.assessor {
            Some(assessor) => assessor.assess(&facts).await?,
            None => Vec::new(),
        };

        rental.return_confirmation.confirm(party);
        rental.damage = reported;
        rental.returned_at = Some(now);
        rental.advance(returned, actor.user, now);
        let completed = rental.next_status(RentalAction::Complete)?;
        rental.advance(completed, actor.user, now);
        rental.penalties.extend(penalties.iter().copied());

        info!(
            rental_id = %id,
            damage = %reported,
            days_late = facts.days_late(),
            penalties = penalties.len(),
            "rental completed"
        );
        Ok(ReturnOutcome {
            rental: rental.clone(),
            newly_confirmed: true,
            completed: true,
            penalties,
            feedback_required: true,
        })
    }

    /// Delete an item, refusing while it has pending, approved or delivered rentals
    pub async fn retire_item(&self, actor: &Actor, item_id: &ItemId) -> Result<Item> {
        let rentals = self.rentals.write().await;
        let active = rentals
            .values()
            .filter(|r| &r.item_id == item_id && r.status.is_active())
            .count();
        if active > 0 {
            return Err(LendError::validation(
                "item_id",
                format!("item has {} active rental(s)", active),
            ));
        }
        self.catalog.remove(actor, item_id).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get(&self, id: &RentalId) -> Result<Rental> {
        self.rentals
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| LendError::not_found("rental", id))
    }

    /// Requests waiting for `owner`'s decision, newest first
    pub async fn pending_for_owner(&self, owner: &UserId) -> Vec<Rental> {
        self.collect(|r| &r.owner == owner && r.status == RentalStatus::Pending)
            .await
    }

    pub async fn activities(&self, user: &UserId) -> Activities {
        let rentals = self.rentals.read().await;
        let mut activities = Activities::default();
        for rental in rentals.values() {
            if &rental.borrower == user {
                activities.as_borrower.push(rental.clone());
            } else if &rental.owner == user {
                activities.as_owner.push(rental.clone());
            }
        }
        newest_first(&mut activities.as_borrower);
        newest_first(&mut activities.as_owner);
        activities
    }

    /// Every rental `user` is a party to, newest first
    pub async fn rentals_of(&self, user: &UserId) -> Vec<Rental> {
        self.collect(|r| r.is_party(user)).await
    }

    /// Pending, approved or delivered rentals of an item
    pub async fn active_for_item(&self, item_id: &ItemId) -> Vec<Rental> {
        self.collect(|r| &r.item_id == item_id && r.status.is_active())
            .await
    }

    /// Rentals whose parties may message each other
    pub async fn chat_eligible(&self, user: &UserId) -> Vec<Rental> {
        self.collect(|r| r.is_party(user) && r.status.allows_chat())
            .await
    }

    pub async fn len(&self) -> usize {
        self.rentals.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rentals.read().await.is_empty()
    }

    async fn collect(&self, keep: impl Fn(&Rental) -> bool) -> Vec<Rental> {
        let rentals = self.rentals.read().await;
        let mut found: Vec<Rental> = rentals.values().filter(|r| keep(r)).cloned().collect();
        newest_first(&mut found);
        found
    }
}

fn newest_first(rentals: &mut [Rental]) {
    rentals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn check_no_overlap(
    rentals: &HashMap<RentalId, Rental>,
    item: &Item,
    range: &DateRange,
    except: Option<&RentalId>,
) -> Result<()> {
    let clash = rentals.values().find(|r| {
        r.item_id == item.id
            && Some(&r.id) != except
            && r.status.holds_dates()
            && r.range.overlaps(range)
    });
    match clash {
        Some(existing) => Err(LendError::unavailable(
            item.id,
            format!("{} overlaps rental {} ({})", range, existing.id, existing.range),
        )),
        None => Ok(()),
    }
}
