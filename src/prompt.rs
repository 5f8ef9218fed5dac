//! Prompt construction for the doctor persona
//!
//! Both parametric answering and grounded generation use one template with
//! Context / Question / Medical Info sections. Parametric answering leaves the
//! medical info empty.

use std::fmt::Write;

const PERSONA: &str = "You are a kind, experienced doctor. Answer the patient's question clearly and \
compassionately, in plain language. Use the conversation context and any medical information \
provided. If you are not confident, say so and recommend consulting a licensed medical professional.";

/// Prompt for answering from the model's own knowledge
pub fn parametric_prompt(context: &str, question: &str) -> String {
    doctor_prompt(context, question, "")
}

/// Prompt for answering from retrieved passages
pub fn grounded_prompt(context: &str, question: &str, content: &str) -> String {
    doctor_prompt(context, question, content)
}

fn doctor_prompt(context: &str, question: &str, content: &str) -> String {
    let mut prompt = String::with_capacity(
        PERSONA.len() + context.len() + question.len() + content.len() + 64,
    );
    prompt.push_str(PERSONA);
    let _ = write!(
        prompt,
        "\n\nContext:\n{}\n\nQuestion:\n{}\n\nMedical Info:\n{}\n",
        context.trim(),
        question.trim(),
        content.trim()
    );
    prompt
}
