use std::sync::Arc;

use storage::repository::{AssessmentRepository, LearnerRepository, QuestionBank};
use tracing::{debug, info};
use tutor_core::model::{
    AssessmentId, AssessmentOutcome, AssessmentQuestion, AssessmentSession, LearnerId,
    NewAssessment, QuestionId,
};

use super::plan::AssessmentPlan;
use crate::Clock;
use crate::error::AssessmentServiceError;

/// A freshly started quiz and the questions to present, in asking order.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedAssessment {
    pub session: AssessmentSession,
    pub questions: Vec<AssessmentQuestion>,
    pub abandoned: Option<AssessmentId>,
}

/// Drives the "assess level" journey: start, answer, complete or abandon.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    plan: AssessmentPlan,
    learners: Arc<dyn LearnerRepository>,
    assessments: Arc<dyn AssessmentRepository>,
    questions: Arc<dyn QuestionBank>,
}

impl AssessmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        learners: Arc<dyn LearnerRepository>,
        assessments: Arc<dyn AssessmentRepository>,
        questions: Arc<dyn QuestionBank>,
    ) -> Self {
        Self {
            clock,
            plan: AssessmentPlan::default(),
            learners,
            assessments,
            questions,
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: AssessmentPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Start a new quiz for `learner`, abandoning any quiz still in progress.
    ///
    /// # Errors
    ///
    /// Returns `LearnerNotFound` for an unknown learner, `NoQuestions` when the bank is
    /// empty, or `Storage` if persistence fails.
    pub async fn start(
        &self,
        learner: LearnerId,
    ) -> Result<StartedAssessment, AssessmentServiceError> {
        if self.learners.get_learner(learner).await?.is_none() {
            return Err(AssessmentServiceError::LearnerNotFound(learner));
        }

        let bank = self.questions.list_assessment_questions().await?;
        let questions = self.plan.sample(bank);
        if questions.is_empty() {
            return Err(AssessmentServiceError::NoQuestions);
        }

        let snapshot = questions.iter().map(AssessmentQuestion::scorable).collect();
        let started = self
            .assessments
            .start_assessment(NewAssessment::new(learner, snapshot, self.clock.now()))
            .await?;

        if let Some(previous) = started.abandoned {
            info!(
                learner_id = %learner,
                assessment_id = %previous,
                "abandoned in-progress assessment"
            );
        }
        info!(
            learner_id = %learner,
            assessment_id = %started.session.id(),
            questions = questions.len(),
            "assessment started"
        );

        Ok(StartedAssessment {
            session: started.session,
            questions,
            abandoned: started.abandoned,
        })
    }

    /// The learner's in-progress quiz, if any.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn current(
        &self,
        learner: LearnerId,
    ) -> Result<Option<AssessmentSession>, AssessmentServiceError> {
        Ok(self.assessments.in_progress_for(learner).await?)
    }

    /// Full question records for a session, in the session's asking order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if a snapshot question no longer exists in the bank.
    pub async fn questions_for(
        &self,
        session: &AssessmentSession,
    ) -> Result<Vec<AssessmentQuestion>, AssessmentServiceError> {
        let ids: Vec<QuestionId> = session.questions().iter().map(|q| q.id).collect();
        Ok(self.questions.get_assessment_questions(&ids).await?)
    }

    /// Record (or overwrite) one answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `Assessment` for a terminal session or a question outside
    /// the session, or `Storage`.
    pub async fn record_answer(
        &self,
        id: AssessmentId,
        question: QuestionId,
        option: u32,
    ) -> Result<AssessmentSession, AssessmentServiceError> {
        let mut session = self.load(id).await?;
        session.record_answer(question, option)?;
        self.assessments.save_assessment(&session).await?;
        debug!(assessment_id = %id, question_id = %question, option, "answer recorded");
        Ok(session)
    }

    /// Score the quiz, classify the level and store both on the session and the learner.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `LearnerNotFound`, `Assessment` if the session is no
    /// longer in progress, or `Storage`. A newer `start` that abandons the session while
    /// it is being scored surfaces as `Storage(StorageError::Conflict)` and leaves the
    /// learner's level untouched.
    pub async fn complete(
        &self,
        id: AssessmentId,
    ) -> Result<AssessmentOutcome, AssessmentServiceError> {
        let mut session = self.load(id).await?;
        let mut learner = self
            .learners
            .get_learner(session.learner_id())
            .await?
            .ok_or(AssessmentServiceError::LearnerNotFound(session.learner_id()))?;

        let now = self.clock.now();
        let outcome = session.complete(now)?;
        learner.apply_assessed_level(outcome.level, now);
        self.assessments
            .finish_assessment(&session, &learner)
            .await?;

        info!(
            learner_id = %learner.id(),
            assessment_id = %id,
            score = outcome.score,
            level = %outcome.level,
            answered = session.answers().len(),
            "assessment completed"
        );
        Ok(outcome)
    }

    /// Abandon a quiz without touching the learner's level.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `Assessment` if the session is already terminal, or
    /// `Storage`.
    pub async fn abandon(&self, id: AssessmentId) -> Result<(), AssessmentServiceError> {
        let mut session = self.load(id).await?;
        session.abandon()?;
        self.assessments.save_assessment(&session).await?;
        info!(
            learner_id = %session.learner_id(),
            assessment_id = %id,
            "assessment abandoned"
        );
        Ok(())
    }

    async fn load(&self, id: AssessmentId) -> Result<AssessmentSession, AssessmentServiceError> {
        self.assessments
            .get_assessment(id)
            .await?
            .ok_or(AssessmentServiceError::SessionNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{InMemoryRepository, LearnerRepository, QuestionBank};
    use tutor_core::model::{AssessmentError, AssessmentStatus, ProficiencyLevel};
    use tutor_core::time::{fixed_clock, fixed_now};

    async fn setup() -> (InMemoryRepository, AssessmentService, LearnerId) {
        let repo = InMemoryRepository::new();
        for (id, level) in [
            (1, ProficiencyLevel::A1),
            (2, ProficiencyLevel::B1),
            (3, ProficiencyLevel::C1),
        ] {
            let q = AssessmentQuestion::new(
                QuestionId::new(id),
                level,
                format!("Q{id}"),
                vec!["right".into(), "wrong".into()],
                0,
                1.0,
                None,
            )
            .unwrap();
            repo.upsert_assessment_question(&q).await.unwrap();
        }
        let learner = repo
            .get_or_create_learner("10", None, fixed_now())
            .await
            .unwrap();
        let svc = AssessmentService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (repo, svc, learner.id())
    }

    #[tokio::test]
    async fn full_journey_sets_learner_level() {
        let (repo, svc, learner) = setup().await;
        let started = svc.start(learner).await.unwrap();
        assert_eq!(started.questions.len(), 3);

        for q in &started.questions {
            svc.record_answer(started.session.id(), q.id(), 0)
                .await
                .unwrap();
        }
        let outcome = svc.complete(started.session.id()).await.unwrap();
        assert_eq!(outcome.score, 1.0);
        assert_eq!(outcome.level, ProficiencyLevel::C2);

        let profile = repo.get_learner(learner).await.unwrap().unwrap();
        assert_eq!(profile.current_level(), Some(ProficiencyLevel::C2));
        assert!(svc.current(learner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restart_abandons_previous_session() {
        let (_repo, svc, learner) = setup().await;
        let first = svc.start(learner).await.unwrap();
        let second = svc.start(learner).await.unwrap();
        assert_eq!(second.abandoned, Some(first.session.id()));

        let err = svc
            .record_answer(first.session.id(), QuestionId::new(1), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssessmentServiceError::Assessment(AssessmentError::InvalidState {
                status: AssessmentStatus::Abandoned
            })
        ));
        assert_eq!(
            svc.current(learner).await.unwrap().map(|s| s.id()),
            Some(second.session.id())
        );
    }

    #[tokio::test]
    async fn abandon_keeps_level_untouched() {
        let (repo, svc, learner) = setup().await;
        let started = svc.start(learner).await.unwrap();
        svc.abandon(started.session.id()).await.unwrap();

        let profile = repo.get_learner(learner).await.unwrap().unwrap();
        assert_eq!(profile.current_level(), None);
        assert!(matches!(
            svc.complete(started.session.id()).await,
            Err(AssessmentServiceError::Assessment(_))
        ));
    }

    #[tokio::test]
    async fn unanswered_quiz_scores_a1() {
        let (_repo, svc, learner) = setup().await;
        let started = svc.start(learner).await.unwrap();
        let outcome = svc.complete(started.session.id()).await.unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.level, ProficiencyLevel::A1);
    }

    #[tokio::test]
    async fn questions_for_follows_snapshot_order() {
        let (_repo, svc, learner) = setup().await;
        let started = svc.start(learner).await.unwrap();
        let reloaded = svc.questions_for(&started.session).await.unwrap();
        assert_eq!(reloaded, started.questions);
    }

    #[tokio::test]
    async fn empty_bank_and_unknown_learner_are_errors() {
        let repo = InMemoryRepository::new();
        let svc = AssessmentService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        assert!(matches!(
            svc.start(LearnerId::new(5)).await,
            Err(AssessmentServiceError::LearnerNotFound(_))
        ));

        let learner = repo
            .get_or_create_learner("5", None, fixed_now())
            .await
            .unwrap();
        assert!(matches!(
            svc.start(learner.id()).await,
            Err(AssessmentServiceError::NoQuestions)
        ));
    }
}
