//! Reputation book: reviews, complaints, standings and bans

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use lendloop_types::{Actor, Clock, ComplaintId, LendError, RentalId, Result, ReviewId, UserId};

use crate::feedback::check_stars;
use crate::{Complaint, ComplaintDraft, ComplaintStatus, FeedbackStatus, RentalView, Review};

/// Sanction rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationPolicy {
    /// Valid complaints that trigger a permanent ban
    #[serde(default = "default_ban_threshold")]
    pub ban_threshold: u32,

    /// Treat every complaint as valid the moment it is filed
    #[serde(default)]
    pub auto_validate_complaints: bool,
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self {
            ban_threshold: default_ban_threshold(),
            auto_validate_complaints: false,
        }
    }
}

fn default_ban_threshold() -> u32 {
    20
}

/// Running totals for one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub rating_sum: u64,
    pub rating_count: u64,
    pub valid_complaints: u32,
    /// Set once, never cleared
    pub banned_at: Option<DateTime<Utc>>,
}

impl Standing {
    pub fn is_banned(&self) -> bool {
        self.banned_at.is_some()
    }

    /// Mean of all received stars, 0 with no reviews
    pub fn star_rating(&self) -> f64 {
        if self.rating_count == 0 {
            return 0.0;
        }
        one_decimal(self.rating_sum as f64 / self.rating_count as f64)
    }
}

/// A member's public reputation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationStats {
    pub user: UserId,
    /// 0.0 to 5.0, one decimal
    pub stars: f64,
    pub review_count: u64,
    /// Percentage of rentals completed without a valid complaint against the member
    pub success_rate: f64,
    pub complaint_count: u32,
    pub is_banned: bool,
}

/// Result of filing or adjudicating a complaint
#[derive(Debug, Clone)]
pub struct ComplaintOutcome {
    pub complaint: Complaint,
    /// This complaint pushed the accused over the ban threshold
    pub banned_now: bool,
}

#[derive(Default)]
struct ReputationState {
    reviews: Vec<Review>,
    complaints: Vec<Complaint>,
    standings: HashMap<UserId, Standing>,
}

impl ReputationState {
    /// Count a valid complaint; true if it caused a ban
    fn count_valid_complaint(&mut self, accused: UserId, threshold: u32, at: DateTime<Utc>) -> bool {
        let standing = self.standings.entry(accused).or_default();
        standing.valid_complaints += 1;
        if !standing.is_banned() && standing.valid_complaints >= threshold {
            standing.banned_at = Some(at);
            return true;
        }
        false
    }
}

#[derive(Clone)]
pub struct ReputationBook {
    state: Arc<RwLock<ReputationState>>,
    policy: ReputationPolicy,
    clock: Arc<dyn Clock>,
}

impl ReputationBook {
    pub fn new(policy: ReputationPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ReputationState::default())),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &ReputationPolicy {
        &self.policy
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// Rate the other party of a completed rental, once
    pub async fn submit_review(
        &self,
        actor: &Actor,
        rental: &RentalView,
        rated: UserId,
        stars: u8,
        comment: Option<String>,
    ) -> Result<Review> {
        rental.check_pair(&actor.user, &rated, "rated")?;
        if !rental.completed {
            return Err(LendError::validation(
                "rental_id",
                format!("{} is not completed yet", rental.rental_id),
            ));
        }
        check_stars(stars)?;

        let mut state = self.state.write().await;
        let duplicate = state
            .reviews
            .iter()
            .any(|r| r.rental_id == rental.rental_id && r.rater == actor.user);
        if duplicate {
            return Err(LendError::validation(
                "rental_id",
                format!("{} already reviewed {}", actor.user, rental.rental_id),
            ));
        }

        let review = Review {
            id: ReviewId::new(),
            rental_id: rental.rental_id,
            rater: actor.user,
            rated,
            stars,
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at: self.clock.now(),
        };
        state.reviews.push(review.clone());
        let standing = state.standings.entry(rated).or_default();
        standing.rating_sum += u64::from(stars);
        standing.rating_count += 1;

        info!(review_id = %review.id, rental_id = %review.rental_id, %rated, stars, "review submitted");
        Ok(review)
    }

    /// Whether `user` still owes a review for `rental`
    pub async fn feedback_required(&self, rental: &RentalView, user: &UserId) -> bool {
        if !rental.completed || !rental.is_party(user) {
            return false;
        }
        let state = self.state.read().await;
        !state
            .reviews
            .iter()
            .any(|r| r.rental_id == rental.rental_id && &r.rater == user)
    }

    pub async fn feedback_status(&self, rental: &RentalView) -> FeedbackStatus {
        let state = self.state.read().await;
        let mut status = FeedbackStatus::default();
        for review in state.reviews.iter().filter(|r| r.rental_id == rental.rental_id) {
            if review.rater == rental.owner {
                status.owner_submitted = true;
            } else if review.rater == rental.borrower {
                status.borrower_submitted = true;
            }
        }
        status
    }

    /// Reviews `user` has received, oldest first
    pub async fn reviews_of(&self, user: &UserId) -> Vec<Review> {
        let state = self.state.read().await;
        state.reviews.iter().filter(|r| &r.rated == user).cloned().collect()
    }

    pub async fn reviews_for_rental(&self, rental_id: &RentalId) -> Vec<Review> {
        let state = self.state.read().await;
        state
            .reviews
            .iter()
            .filter(|r| &r.rental_id == rental_id)
            .cloned()
            .collect()
    }

    // ========================================================================
    // Complaints
    // ========================================================================

    /// File a complaint against the other party of a rental
    pub async fn file_complaint(
        &self,
        actor: &Actor,
        rental: &RentalView,
        draft: ComplaintDraft,
    ) -> Result<ComplaintOutcome> {
        rental.check_pair(&actor.user, &draft.accused, "accused")?;
        if draft.description.trim().is_empty() {
            return Err(LendError::validation("description", "must not be empty"));
        }
        if draft.proof_images.iter().any(|i| i.trim().is_empty()) {
            return Err(LendError::validation("proof_images", "empty image reference"));
        }

        let now = self.clock.now();
        let auto = self.policy.auto_validate_complaints;
        let complaint = Complaint {
            id: ComplaintId::new(),
            rental_id: rental.rental_id,
            complainant: actor.user,
            accused: draft.accused,
            kind: draft.kind,
            description: draft.description,
            proof_images: draft.proof_images,
            status: if auto {
                ComplaintStatus::Valid
            } else {
                ComplaintStatus::Pending
            },
            created_at: now,
            resolved_at: auto.then_some(now),
        };

        let mut state = self.state.write().await;
        state.complaints.push(complaint.clone());
        let banned_now = auto
            && state.count_valid_complaint(complaint.accused, self.policy.ban_threshold, now);

        info!(
            complaint_id = %complaint.id,
            accused = %complaint.accused,
            kind = %complaint.kind,
            status = %complaint.status,
            "complaint filed"
        );
        if banned_now {
            warn!(user = %complaint.accused, "member banned after reaching the complaint threshold");
        }
        Ok(ComplaintOutcome {
            complaint,
            banned_now,
        })
    }

    /// Resolve a pending complaint
    pub async fn adjudicate(&self, id: &ComplaintId, valid: bool) -> Result<ComplaintOutcome> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let complaint = state
            .complaints
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| LendError::not_found("complaint", id))?;
        if complaint.status != ComplaintStatus::Pending {
            return Err(LendError::InvalidTransition {
                entity: id.to_string(),
                from: complaint.status.to_string(),
                action: "adjudicate".to_string(),
            });
        }

        complaint.status = if valid {
            ComplaintStatus::Valid
        } else {
            ComplaintStatus::Dismissed
        };
        complaint.resolved_at = Some(now);
        let complaint = complaint.clone();

        let banned_now =
            valid && state.count_valid_complaint(complaint.accused, self.policy.ban_threshold, now);

        info!(complaint_id = %id, status = %complaint.status, "complaint adjudicated");
        if banned_now {
            warn!(user = %complaint.accused, "member banned after reaching the complaint threshold");
        }
        Ok(ComplaintOutcome {
            complaint,
            banned_now,
        })
    }

    pub async fn complaint(&self, id: &ComplaintId) -> Result<Complaint> {
        let state = self.state.read().await;
        state
            .complaints
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| LendError::not_found("complaint", id))
    }

    /// Complaints filed against `user`, oldest first
    pub async fn complaints_against(&self, user: &UserId) -> Vec<Complaint> {
        let state = self.state.read().await;
        state
            .complaints
            .iter()
            .filter(|c| &c.accused == user)
            .cloned()
            .collect()
    }

    pub async fn pending_complaints(&self) -> Vec<Complaint> {
        let state = self.state.read().await;
        state
            .complaints
            .iter()
            .filter(|c| c.status == ComplaintStatus::Pending)
            .cloned()
            .collect()
    }

    // ========================================================================
    // Standing
    // ========================================================================

    pub async fn is_banned(&self, user: &UserId) -> bool {
        let state = self.state.read().await;
        state.standings.get(user).map_or(false, Standing::is_banned)
    }

    /// Fail with `NotAuthorized` if `user` is banned
    pub async fn ensure_not_banned(&self, user: &UserId) -> Result<()> {
        if self.is_banned(user).await {
            return Err(LendError::not_authorized(format!("{} is banned", user)));
        }
        Ok(())
    }

    pub async fn standing(&self, user: &UserId) -> Standing {
        let state = self.state.read().await;
        state.standings.get(user).cloned().unwrap_or_default()
    }

    /// Reputation of `user` given every rental they are a party to
    pub async fn stats(&self, user: &UserId, rentals: &[RentalView]) -> ReputationStats {
        let state = self.state.read().await;
        let standing = state.standings.get(user).cloned().unwrap_or_default();

        let complained: HashSet<RentalId> = state
            .complaints
            .iter()
            .filter(|c| &c.accused == user && c.is_valid())
            .map(|c| c.rental_id)
            .collect();
        let mine: Vec<&RentalView> = rentals.iter().filter(|r| r.is_party(user)).collect();
        let successful = mine
            .iter()
            .filter(|r| r.completed && !complained.contains(&r.rental_id))
            .count();
        let success_rate = if mine.is_empty() {
            0.0
        } else {
            one_decimal(successful as f64 / mine.len() as f64 * 100.0)
        };

        ReputationStats {
            user: *user,
            stars: standing.star_rating(),
            review_count: standing.rating_count,
            success_rate,
            complaint_count: standing.valid_complaints,
            is_banned: standing.is_banned(),
        }
    }
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lendloop_types::{ComplaintKind, ManualClock};

    fn book(auto_validate: bool) -> ReputationBook {
        let clock = Arc::new(ManualClock::on(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()));
        ReputationBook::new(
            ReputationPolicy {
                auto_validate_complaints: auto_validate,
                ..Default::default()
            },
            clock,
        )
    }

    fn rental(owner: UserId, borrower: UserId, completed: bool) -> RentalView {
        RentalView {
            rental_id: RentalId::new(),
            owner,
            borrower,
            completed,
        }
    }

    fn complaint_against(accused: UserId) -> ComplaintDraft {
        ComplaintDraft {
            accused,
            kind: ComplaintKind::Behavior,
            description: "no-show at handover".to_string(),
            proof_images: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_review_rules() {
        let book = book(false);
        let owner = Actor::new(UserId::new());
        let borrower = Actor::new(UserId::new());
        let open = rental(owner.user, borrower.user, false);
        let done = rental(owner.user, borrower.user, true);

        let early = book.submit_review(&owner, &open, borrower.user, 5, None).await;
        assert!(matches!(early, Err(LendError::ValidationError { .. })));

        let self_review = book.submit_review(&owner, &done, owner.user, 5, None).await;
        assert!(matches!(self_review, Err(LendError::ValidationError { .. })));

        let stranger = Actor::new(UserId::new());
        let outsider = book.submit_review(&stranger, &done, owner.user, 5, None).await;
        assert!(matches!(outsider, Err(LendError::NotAuthorized { .. })));

        let zero = book.submit_review(&owner, &done, borrower.user, 0, None).await;
        assert!(matches!(zero, Err(LendError::ValidationError { .. })));

        book.submit_review(&owner, &done, borrower.user, 4, Some("on time".into()))
            .await
            .unwrap();
        let twice = book.submit_review(&owner, &done, borrower.user, 5, None).await;
        assert!(matches!(twice, Err(LendError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_feedback_gate() {
        let book = book(false);
        let owner = Actor::new(UserId::new());
        let borrower = Actor::new(UserId::new());
        let done = rental(owner.user, borrower.user, true);

        assert!(book.feedback_required(&done, &owner.user).await);
        assert!(book.feedback_required(&done, &borrower.user).await);
        assert!(!book.feedback_required(&done, &UserId::new()).await);

        book.submit_review(&borrower, &done, owner.user, 5, None).await.unwrap();
        assert!(book.feedback_required(&done, &owner.user).await);
        assert!(!book.feedback_required(&done, &borrower.user).await);

        let status = book.feedback_status(&done).await;
        assert!(status.borrower_submitted);
        assert!(!status.owner_submitted);
        assert!(!status.is_complete());
    }

    #[tokio::test]
    async fn test_star_average() {
        let book = book(false);
        let owner = UserId::new();
        for stars in [5, 4, 4] {
            let borrower = Actor::new(UserId::new());
            let done = rental(owner, borrower.user, true);
            book.submit_review(&borrower, &done, owner, stars, None).await.unwrap();
        }
        let stats = book.stats(&owner, &[]).await;
        assert_eq!(stats.stars, 4.3);
        assert_eq!(stats.review_count, 3);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_success_rate_excludes_validly_complained_rentals() {
        let book = book(false);
        let owner = Actor::new(UserId::new());
        let borrower = Actor::new(UserId::new());
        let rentals = vec![
            rental(owner.user, borrower.user, true),
            rental(owner.user, borrower.user, true),
            rental(owner.user, borrower.user, true),
            rental(owner.user, borrower.user, false),
        ];

        let stats = book.stats(&borrower.user, &rentals).await;
        assert_eq!(stats.success_rate, 75.0);

        let filed = book
            .file_complaint(&owner, &rentals[0], complaint_against(borrower.user))
            .await
            .unwrap();
        assert_eq!(filed.complaint.status, ComplaintStatus::Pending);
        assert_eq!(book.stats(&borrower.user, &rentals).await.success_rate, 75.0);

        book.adjudicate(&filed.complaint.id, true).await.unwrap();
        let stats = book.stats(&borrower.user, &rentals).await;
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.complaint_count, 1);
        // the owner's record is unaffected
        assert_eq!(book.stats(&owner.user, &rentals).await.success_rate, 75.0);
    }

    #[tokio::test]
    async fn test_complaint_parties() {
        let book = book(false);
        let owner = Actor::new(UserId::new());
        let borrower = Actor::new(UserId::new());
        let view = rental(owner.user, borrower.user, false);

        let wrong = book
            .file_complaint(&owner, &view, complaint_against(UserId::new()))
            .await;
        assert!(matches!(wrong, Err(LendError::ValidationError { .. })));

        let outsider = book
            .file_complaint(&Actor::new(UserId::new()), &view, complaint_against(owner.user))
            .await;
        assert!(matches!(outsider, Err(LendError::NotAuthorized { .. })));
    }

    #[tokio::test]
    async fn test_adjudicate_once() {
        let book = book(false);
        let owner = Actor::new(UserId::new());
        let borrower = Actor::new(UserId::new());
        let view = rental(owner.user, borrower.user, true);
        let filed = book
            .file_complaint(&borrower, &view, complaint_against(owner.user))
            .await
            .unwrap();

        let dismissed = book.adjudicate(&filed.complaint.id, false).await.unwrap();
        assert_eq!(dismissed.complaint.status, ComplaintStatus::Dismissed);
        assert_eq!(book.standing(&owner.user).await.valid_complaints, 0);

        let again = book.adjudicate(&filed.complaint.id, true).await;
        assert!(matches!(again, Err(LendError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_twentieth_valid_complaint_bans() {
        let book = book(true);
        let accused = Actor::new(UserId::new());

        for n in 1..=19 {
            let complainant = Actor::new(UserId::new());
            let view = rental(accused.user, complainant.user, true);
            let outcome = book
                .file_complaint(&complainant, &view, complaint_against(accused.user))
                .await
                .unwrap();
            assert_eq!(outcome.complaint.status, ComplaintStatus::Valid);
            assert!(!outcome.banned_now, "banned after {} complaints", n);
        }
        assert!(!book.is_banned(&accused.user).await);
        assert!(book.ensure_not_banned(&accused.user).await.is_ok());

        let complainant = Actor::new(UserId::new());
        let view = rental(accused.user, complainant.user, true);
        let outcome = book
            .file_complaint(&complainant, &view, complaint_against(accused.user))
            .await
            .unwrap();
        assert!(outcome.banned_now);
        assert!(book.is_banned(&accused.user).await);
        assert!(matches!(
            book.ensure_not_banned(&accused.user).await,
            Err(LendError::NotAuthorized { .. })
        ));

        // Further complaints keep counting but do not re-ban
        let complainant = Actor::new(UserId::new());
        let view = rental(accused.user, complainant.user, true);
        let outcome = book
            .file_complaint(&complainant, &view, complaint_against(accused.user))
            .await
            .unwrap();
        assert!(!outcome.banned_now);
        assert_eq!(book.standing(&accused.user).await.valid_complaints, 21);
    }

    #[tokio::test]
    async fn test_pending_complaints_do_not_count() {
        let book = book(false);
        let accused = Actor::new(UserId::new());
        for _ in 0..25 {
            let complainant = Actor::new(UserId::new());
            let view = rental(accused.user, complainant.user, true);
            book.file_complaint(&complainant, &view, complaint_against(accused.user))
                .await
                .unwrap();
        }
        assert!(!book.is_banned(&accused.user).await);
        assert_eq!(book.pending_complaints().await.len(), 25);
        assert_eq!(book.complaints_against(&accused.user).await.len(), 25);
    }
}
