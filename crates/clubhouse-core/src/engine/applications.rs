//! Membership application operations.

use uuid::Uuid;

use super::{missing, Call, Engine, Reply};
use crate::{
  access::{Action, Resource},
  activity::{ActivityLog, ActivityLogEntry},
  actor::Role,
  application::{MembershipApplication, NewApplication},
  collab::{AthleteProfile, Notification, NotificationKind, Notifier},
  store::{ClubStore, IdempotencyStore, Outcome},
  workflow::{plan_review, ReviewDecision, ReviewStatus, WorkflowEntity},
  Error, Result,
};

const APPLICATION: &str = "membership application";

impl<S, N> Engine<S, N>
where
  S: ClubStore + IdempotencyStore,
  N: Notifier,
{
  /// Submit an application on behalf of the calling athlete.
  pub async fn submit_application(
    &self,
    call: &Call,
    input: NewApplication,
  ) -> Result<Reply<MembershipApplication>> {
    let target = [input.club_id];
    self
      .mutate(call, "application.submit", &target, move |step, receipt| async move {
        input.validate()?;
        let actor = &call.actor;
        self
          .authorize(actor, Action::Submit, &Resource::about(input.club_id, actor.id))
          .await?;

        let now = self.clock.now();
        let mut activity_log = ActivityLog::new();
        activity_log.append(ActivityLogEntry::submitted(actor.id, now));

        let application = MembershipApplication {
          application_id: Uuid::new_v4(),
          user_id: actor.id,
          club_id: input.club_id,
          personal_info: input.personal_info,
          documents: input.documents,
          status: ReviewStatus::Pending,
          review: None,
          activity_log,
          profile_id: None,
          version: 0,
          created_at: now,
        };

        let application = match self
          .store
          .insert_application(application, receipt)
          .await
          .map_err(Error::storage)?
        {
          Outcome::Committed(a) => a,
          Outcome::Duplicate | Outcome::Stale => {
            return Err(Error::Conflict(
              "an application for this club already exists".into(),
            ));
          }
        };

        tracing::info!(application_id = %application.application_id, "application submitted");
        self
          .notify(Notification {
            kind:           NotificationKind::ApplicationSubmitted,
            recipient:      application.user_id,
            entity_id:      application.application_id,
            status:         application.status.to_string(),
            correlation_id: step.correlation_id,
          })
          .await;

        Ok(application)
      })
      .await
  }

  pub async fn approve_application(
    &self,
    call: &Call,
    application_id: Uuid,
    notes: Option<String>,
  ) -> Result<Reply<MembershipApplication>> {
    self
      .review_application(
        call,
        "application.approve",
        application_id,
        ReviewDecision::Approve { notes },
      )
      .await
  }

  pub async fn reject_application(
    &self,
    call: &Call,
    application_id: Uuid,
    reason: String,
  ) -> Result<Reply<MembershipApplication>> {
    self
      .review_application(
        call,
        "application.reject",
        application_id,
        ReviewDecision::Reject { reason },
      )
      .await
  }

  async fn review_application(
    &self,
    call: &Call,
    operation: &'static str,
    application_id: Uuid,
    decision: ReviewDecision,
  ) -> Result<Reply<MembershipApplication>> {
    self
      .mutate(call, operation, &[application_id], move |step, receipt| async move {
        decision.validate()?;
        let actor = &call.actor;

        let current = self
          .store
          .get_application(application_id)
          .await
          .map_err(Error::storage)?
          .ok_or_else(|| missing(actor, APPLICATION))?;
        self.authorize(actor, Action::Review, &current.resource()).await?;

        let now = self.clock.now();
        let review = plan_review(&current, decision, actor, now)?;
        let profile = (review.to == ReviewStatus::Approved)
          .then(|| AthleteProfile::new(current.user_id, current.club_id, now));

        let updated = match self
          .store
          .commit_application_review(review, profile, receipt)
          .await
          .map_err(Error::storage)?
        {
          Outcome::Committed(a) => a,
          Outcome::Stale | Outcome::Duplicate => {
            return Err(Error::InvalidState(format!(
              "{APPLICATION} {application_id} was reviewed concurrently"
            )));
          }
        };

        tracing::info!(
          application_id = %updated.application_id,
          status = %updated.status,
          "application reviewed"
        );
        self
          .notify(Notification {
            kind:           NotificationKind::ApplicationReviewed,
            recipient:      updated.user_id,
            entity_id:      updated.application_id,
            status:         updated.status.to_string(),
            correlation_id: step.correlation_id,
          })
          .await;

        Ok(updated)
      })
      .await
  }

  pub async fn get_application(
    &self,
    call: &Call,
    application_id: Uuid,
  ) -> Result<Reply<MembershipApplication>> {
    self
      .read(call, "application.get", |_| async move {
        let actor = &call.actor;
        let application = self
          .store
          .get_application(application_id)
          .await
          .map_err(Error::storage)?
          .ok_or_else(|| missing(actor, APPLICATION))?;
        self.authorize(actor, Action::Read, &application.resource()).await?;
        Ok(application)
      })
      .await
  }

  /// List applications for `club_id`. Coaches default to their own club and
  /// are denied any other; athletes and parents see only the records they
  /// may read; admins may list every club at once.
  pub async fn list_applications(
    &self,
    call: &Call,
    club_id: Option<Uuid>,
  ) -> Result<Reply<Vec<MembershipApplication>>> {
    self
      .read(call, "application.list", |_| async move {
        let actor = &call.actor;
        let club_id = club_id.or(actor.club_id);

        match actor.role {
          Role::Admin => {
            self.store.list_applications(club_id).await.map_err(Error::storage)
          }
          Role::Coach => {
            let club_id = club_id.ok_or(Error::Unauthorized)?;
            self.authorize(actor, Action::Read, &Resource::club(club_id)).await?;
            self.store.list_applications(Some(club_id)).await.map_err(Error::storage)
          }
          Role::Athlete | Role::Parent => {
            let all = self
              .store
              .list_applications(club_id)
              .await
              .map_err(Error::storage)?;
            self.visible(actor, all, |a| a.resource()).await
          }
        }
      })
      .await
  }
}
