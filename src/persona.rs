use serde::Serialize;
use tracing::warn;

/// A named behavioral configuration for the remote agent
#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Prebuilt voice used by the realtime endpoint
    pub voice_name: &'static str,
    pub system_instruction: &'static str,
    /// Opening agent turn for a new chat conversation
    pub greeting: Option<&'static str>,
}

const RECEPTIONIST_INSTRUCTION: &str = concat!(
    "You are Ava, the friendly front-desk receptionist for a small business. ",
    "Greet the caller, find out what they need, and answer briefly and warmly. ",
    "Before the call ends, collect the caller's name, a callback phone number and ",
    "a one-sentence summary of their request, confirm them back, then call the ",
    "submit_lead tool exactly once with those three fields. ",
    "After the tool returns, tell the caller someone will follow up shortly. ",
    "Never give medical, legal or financial advice. ",
    "Never ask for or repeat payment card numbers, passwords or government ID numbers. ",
    "If the caller is in danger, tell them to contact local emergency services."
);

const ASSISTANT_INSTRUCTION: &str = concat!(
    "You are the website assistant for an AI voice agent product. ",
    "Answer questions about features, pricing tiers and setup in two or three short sentences. ",
    "When a visitor shows buying interest, suggest trying the live voice demo or booking a call. ",
    "Never give medical, legal or financial advice. ",
    "Never ask for or repeat payment card numbers, passwords or government ID numbers."
);

const SCHEDULER_INSTRUCTION: &str = concat!(
    "You are an appointment scheduler for a dental clinic. ",
    "Help the caller pick a weekday slot between 9am and 5pm, keep answers short, ",
    "and collect their name, phone number and the reason for the visit, then call ",
    "the submit_lead tool with name, phone and a summary that includes the requested slot. ",
    "Never give medical, legal or financial advice. ",
    "Never ask for or repeat payment card numbers, passwords or government ID numbers."
);

pub const PERSONAS: &[Persona] = &[
    Persona {
        id: "receptionist",
        display_name: "Front-desk receptionist",
        voice_name: "Aoede",
        system_instruction: RECEPTIONIST_INSTRUCTION,
        greeting: None,
    },
    Persona {
        id: "scheduler",
        display_name: "Clinic scheduler",
        voice_name: "Puck",
        system_instruction: SCHEDULER_INSTRUCTION,
        greeting: None,
    },
    Persona {
        id: "assistant",
        display_name: "Website assistant",
        voice_name: "Kore",
        system_instruction: ASSISTANT_INSTRUCTION,
        greeting: Some("Hi! Ask me anything about our AI voice agents, or try the live call demo."),
    },
];

/// Look up a persona, falling back to the first catalog entry
pub fn find(id: &str) -> &'static Persona {
    match PERSONAS.iter().find(|p| p.id == id) {
        Some(persona) => persona,
        None => {
            warn!("Unknown persona '{}', using '{}'", id, PERSONAS[0].id);
            &PERSONAS[0]
        }
    }
}
