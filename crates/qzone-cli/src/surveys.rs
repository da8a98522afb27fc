//! Survey commands.

use qzone_core::Survey;
use qzone_sync::SyncError;

use crate::app::App;

pub(crate) fn run_list(app: &App) {
    let surveys = app.surveys.surveys().borrow().clone();
    if surveys.is_empty() {
        println!("no surveys available");
        return;
    }
    for survey in &surveys {
        println!(
            "{:<24} {:>4} pts  {:<11} {}/{}  {}",
            survey.id,
            survey.points,
            survey.status.as_str(),
            answered(survey),
            survey.question_count,
            survey.title
        );
    }
}

pub(crate) fn run_show(app: &App, survey_id: &str) -> anyhow::Result<()> {
    let survey = find(app, survey_id)?;
    println!("{} ({} points)", survey.title, survey.points);
    println!("{}", survey.description);
    println!("status: {}", survey.status.as_str());

    for (index, question) in survey.questions.iter().enumerate() {
        let marker = if index == survey.current_question_index && !survey.is_completed {
            ">"
        } else {
            " "
        };
        let required = if question.required { "*" } else { "" };
        println!(
            "{marker} [{}] {}{required} ({})",
            question.id,
            question.prompt,
            question.question_type.as_str()
        );
        for option in &question.options {
            println!("      {}. {}", option.label, option.content);
        }
        if let Some(answer) = survey.answers.get(&question.id) {
            println!("      answered: {}", answer.join(", "));
        }
    }
    Ok(())
}

pub(crate) async fn run_answer(
    app: &App,
    survey_id: &str,
    question_id: &str,
    answers: Vec<String>,
) -> anyhow::Result<()> {
    let survey = app
        .surveys
        .answer_question(survey_id, question_id, answers)
        .await
        .map_err(user_facing)?;
    match survey.current_question() {
        Some(next) if !survey.answers.contains_key(&next.id) => {
            println!("saved; next question [{}] {}", next.id, next.prompt);
        }
        _ => println!("saved; all questions answered, run `qzone complete {survey_id}`"),
    }
    Ok(())
}

pub(crate) async fn run_complete(app: &App, survey_id: &str) -> anyhow::Result<()> {
    let survey = find(app, survey_id)?;
    if survey.is_completed {
        return Err(user_facing(SyncError::AlreadyCompleted(survey_id.to_string())));
    }
    if !survey.required_answered() {
        anyhow::bail!("answer every required question before completing {survey_id}");
    }

    let completed = app
        .surveys
        .mark_survey_completed(survey_id)
        .await
        .ok_or_else(|| anyhow::anyhow!("survey {survey_id} disappeared"))?;
    let profile = app.user.add_points(&completed).await.map_err(user_facing)?;
    println!(
        "completed {}: +{} points, balance {}",
        completed.title, completed.points, profile.total_points
    );
    Ok(())
}

fn find(app: &App, survey_id: &str) -> anyhow::Result<Survey> {
    app.surveys.get_survey_by_id(survey_id).ok_or_else(|| {
        user_facing(SyncError::NotFound {
            kind: "survey",
            id: survey_id.to_string(),
        })
    })
}

fn answered(survey: &Survey) -> usize {
    survey
        .questions
        .iter()
        .filter(|q| survey.answers.contains_key(&q.id))
        .count()
}

/// Log the full error and surface the short message.
pub(crate) fn user_facing(error: SyncError) -> anyhow::Error {
    tracing::debug!(error = %error, "command failed");
    anyhow::anyhow!(error.user_message())
}
