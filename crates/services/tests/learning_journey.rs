use services::{AppServices, ContentBundle, SelectionPolicy, ServiceSettings};
use storage::repository::Storage;
use tutor_core::model::{AnswerSet, ProficiencyLevel};
use tutor_core::time::fixed_clock;

fn content() -> ContentBundle {
    serde_json::from_str(
        r#"{
            "assessment_questions": [
                {"id": 1, "level": "A1", "text": "q1", "options": ["a", "b", "c"], "correct_answer": 0},
                {"id": 2, "level": "B1", "text": "q2", "options": ["a", "b", "c"], "correct_answer": 1, "weight": 2.0},
                {"id": 3, "level": "C1", "text": "q3", "options": ["a", "b", "c"], "correct_answer": 2, "weight": 1.5}
            ],
            "tasks": [
                {"id": 1, "level": "A1", "title": "Too easy", "task_type": "text", "body": "x",
                 "published": true,
                 "questions": [{"id": 11, "text": "?", "options": ["a", "b"], "correct_answer": 0}]},
                {"id": 2, "level": "B2", "title": "Just right", "task_type": "text", "body": "y",
                 "published": true,
                 "questions": [
                    {"id": 21, "text": "?", "options": ["a", "b"], "correct_answer": 0},
                    {"id": 22, "text": "?", "options": ["a", "b"], "correct_answer": 1}
                 ]}
            ]
        }"#,
    )
    .unwrap()
}

async fn run_journey(storage: Storage) {
    let settings = ServiceSettings {
        selection: SelectionPolicy::FirstMatch,
        ..ServiceSettings::default()
    };
    let app = AppServices::from_storage(&storage, fixed_clock(), settings);

    let stats = app.sync().sync(&content()).await.unwrap();
    assert_eq!(stats.tasks_created, 2);
    assert_eq!(stats.rejected, 0);

    let learner = app.learners().register("555", Some("sam")).await.unwrap();
    let started = app.assessments().start(learner.id()).await.unwrap();
    assert_eq!(started.questions.len(), 3);

    // q1 right, q2 right, q3 wrong: 3.0 / 4.5
    for (id, option) in [(1, 0), (2, 1), (3, 1)] {
        app.assessments()
            .record_answer(
                started.session.id(),
                tutor_core::model::QuestionId::new(id),
                option,
            )
            .await
            .unwrap();
    }
    let outcome = app
        .assessments()
        .complete(started.session.id())
        .await
        .unwrap();
    assert!((outcome.score - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(outcome.level, ProficiencyLevel::B2);

    let task = app
        .delivery()
        .select_for_learner(learner.id())
        .await
        .unwrap()
        .expect("a B2-adjacent task");
    assert_eq!(task.title(), "Just right");

    let questions = app.completion().questions(task.id()).await.unwrap();
    let answers: AnswerSet = questions.iter().map(|q| (q.id(), 0)).collect();
    let first = app
        .completion()
        .complete_task(learner.id(), task.id(), answers, None)
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.progress.percentage_correct, 50.0);

    let perfect: AnswerSet = questions
        .iter()
        .map(|q| (q.id(), q.correct_answer()))
        .collect();
    let second = app
        .completion()
        .complete_task(learner.id(), task.id(), perfect, Some(12.0))
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.progress.percentage_correct, 100.0);
    assert_eq!(
        app.completion().history(learner.id()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn journey_over_in_memory_storage() {
    run_journey(Storage::in_memory()).await;
}

#[tokio::test]
async fn journey_over_sqlite_storage() {
    let storage = Storage::sqlite("sqlite:file:memdb_journey?mode=memory&cache=shared")
        .await
        .expect("sqlite storage");
    run_journey(storage).await;
}
