use quiz_core::model::{PASS_THRESHOLD, QuestionOutcome};
use services::session::{QuestionView, ResourceView, ResultView};

pub fn question(view: &QuestionView, checked: bool) {
    println!();
    println!("Question {} of {}   [{} left]", view.number, view.total, view.remaining);
    println!("{}", view.prompt);
    for (i, option) in view.options.iter().enumerate() {
        let marker = if option.selected { '*' } else { ' ' };
        println!("  {marker} {}. {}", i + 1, option.text);
    }

    if let Some(feedback) = &view.feedback {
        if feedback.correct {
            println!("Correct!");
        } else {
            println!("Incorrect. The correct answer is: {}", feedback.correct_answer);
        }
        if !feedback.explanation.is_empty() {
            println!("{}", feedback.explanation);
        }
        resources(&feedback.resources);
    }

    let next = if view.is_last { "finish" } else { "next" };
    let hint = match (checked, view.answered, view.feedback.is_some()) {
        (_, false, _) => "pick an option by number".to_owned(),
        (true, true, false) => "[c] check answer, or pick another option".to_owned(),
        (true, true, true) => format!("[n] {next}"),
        (false, true, _) => format!("[n] {next}, or pick another option"),
    };
    println!("({hint}; [t] time, [f] finish now, [q] quit)");
}

pub fn result(view: &ResultView) {
    println!();
    println!("{} complete", view.title);
    println!("Score: {}%  ({} / {} correct)", view.score, view.correct, view.total);
    println!("Time taken: {}", view.time_taken);
    if view.passed {
        println!("Passed.");
    } else {
        println!("Not passed yet; {PASS_THRESHOLD}% is needed.");
    }

    for item in &view.items {
        let verdict = match item.outcome {
            QuestionOutcome::Correct => "correct",
            QuestionOutcome::Incorrect => "incorrect",
            QuestionOutcome::Unanswered => "unanswered",
        };
        println!();
        println!("{}. {} ({verdict})", item.number, item.prompt);
        println!(
            "   Your answer: {}",
            item.your_answer.as_deref().unwrap_or("No answer")
        );
        if !item.outcome.is_correct() {
            println!("   Correct answer: {}", item.correct_answer);
        }
        if !item.explanation.is_empty() {
            println!("   {}", item.explanation);
        }
        resources(&item.resources);
    }
    println!();
    println!("([r] retake, [q] quit)");
}

fn resources(resources: &[ResourceView]) {
    if resources.is_empty() {
        return;
    }
    println!("   Learn more:");
    for resource in resources {
        println!("     - {}: {}", resource.title, resource.url);
    }
}
