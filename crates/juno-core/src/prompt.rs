//! System messages and conversation presets.
//!
//! Instructions are written against three placeholders which
//! [`build_system_message`] fills in from the user profile and the editor
//! context:
//!
//! - `$USER` -- `The USER`, or `The USER (Name: <name>)` when a name is configured
//! - `$LANGUAGE` -- the language of the code the user is working on
//! - `$ASSISTANT` -- the assistant's configured name

use juno_types::llm::Message;

/// Who is talking to whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_name: Option<String>,
    pub assistant_name: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            user_name: None,
            assistant_name: "Juno".to_string(),
        }
    }
}

/// What the user is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorContext {
    pub language: Option<String>,
    /// Code the user is working on, shown to the model for reference.
    pub scratchpad: Option<String>,
}

const SCRATCHPAD_PREAMBLE: &str = "The below scratchpad is provided by the user \n\
so you are aware of the script they are working on. \n\
Even if the below information is populated, it may not be relevant to the user's request. \n\
Use your best judgment to discern if the user is asking for you to modify the below code, \n\
or if the code is there for reference.\n\nSCRATCHPAD:\n\n";

/// Personalize `instruction` and wrap it in the assistant's introduction.
///
/// The scratchpad section is appended only when `use_scratchpad` is set and
/// the editor actually has a non-blank scratchpad.
pub fn build_system_message(
    instruction: &str,
    profile: &UserProfile,
    editor: &EditorContext,
    use_scratchpad: bool,
) -> String {
    let user = match profile.user_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("The USER (Name: {name})"),
        _ => "The USER".to_string(),
    };
    let language = editor
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let personalized = instruction
        .replace("$USER", &user)
        .replace("$LANGUAGE", language.unwrap_or("the requested"))
        .replace("$ASSISTANT", &profile.assistant_name);

    let intro = match language {
        Some(language) => format!("You are a {language} coding assistant"),
        None => "You are a coding assistant".to_string(),
    };
    let mut message = format!("{intro} named {}.\n{personalized}", profile.assistant_name);

    if let Some(scratchpad) = editor.scratchpad.as_deref().filter(|s| !s.trim().is_empty()) {
        if use_scratchpad {
            message.push_str("\n\n");
            message.push_str(SCRATCHPAD_PREAMBLE);
            message.push_str(scratchpad);
        }
    }
    message
}

const ANSWER_RULES: &str = "1. Respond in markdown format\n\
2. When providing code blocks you have to qualify it with what language. e.g ```javascript or ```typescript.\n\
3. Always answer as $ASSISTANT and avoid using phrases as \"as a large language model\" etc.\n\
4. Use the scratchpad if relevant to the question";

/// The conversation flavours the shell offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Free-form questions, answered in markdown.
    OpenPrompt,
    /// Write code from instructions.
    CreateCode,
    /// One-shot review of the scratchpad.
    SuggestImprovements,
}

impl Preset {
    pub fn instruction(self) -> String {
        match self {
            Preset::OpenPrompt => format!(
                "$USER will ask both generic and specific questions that you will try to answer as best as possible. \n\nAlways adhere to the folling rules:\n\n{ANSWER_RULES}"
            ),
            Preset::CreateCode => "$USER will give you instructions to help write functions. \n\
You may ask for clarification if needed, but otherwise you should only output $LANGUAGE code. \n\
Provide explanations of the code only if the user asks for them. \n\
Make sure to respond with the code inside a markdown code block (e.g. ```typescript) or ```python."
                .to_string(),
            Preset::SuggestImprovements => format!(
                "$USER will ask you how to improve their code. You should use the provided code (if any) and respond with practical solutions.\n\nAlways adhere to the folling rules:\n\n{ANSWER_RULES}\n5. Apply common structural/creational/behavioural software patterns to your edits when relevant"
            ),
        }
    }

    /// User message the preset starts with, if it does not ask for one.
    pub fn seed_message(self) -> Option<&'static str> {
        match self {
            Preset::SuggestImprovements => Some("How may I improve this code?"),
            _ => None,
        }
    }

    /// Whether the user can keep asking follow-up questions.
    pub fn has_follow_ups(self) -> bool {
        !matches!(self, Preset::SuggestImprovements)
    }

    /// System message for this preset.
    pub fn system_message(self, profile: &UserProfile, editor: &EditorContext) -> Message {
        Message::system(build_system_message(&self.instruction(), profile, editor, true))
    }
}

/// System message for repository questions answered through `getContext`.
pub const QUERY_REPOSITORY_SYSTEM: &str = "You are a helpful assistant. You are to answer the users question as best as possible while respecting the following rules:\n\n\
1. Do not make up an answer\n\
2. Use the available functions to retrieve information\n\
3. Continue search for information until you can confidently answer the question\n\n\
IMPORTANT: Do not answer the question without retrieving context";

/// User message wrapping a repository question.
pub fn query_repository_prompt(question: &str) -> String {
    format!(
        "Use the getContext function to search the code base for information to answer the following question. \
Please present relevant code blocks if appropriate. \
If you are not confident in your answer, you can use the getContext function multiple times with new queries to help you get more information. \
Do not reference the getContext function in your answer.\n\nQuestion: {question}"
    )
}
