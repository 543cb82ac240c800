//! Fixed tables describing the ChoiceScript language: commands, built-in
//! variables, operators and functions.

pub const VALID_COMMANDS: &[&str] = &[
    "abort",
    "achieve",
    "achievement",
    "advertisement",
    "allow_reuse",
    "author",
    "bug",
    "check_achievements",
    "check_purchase",
    "check_registration",
    "choice",
    "comment",
    "config",
    "create",
    "delay_break",
    "delay_ending",
    "delete",
    "disable_reuse",
    "else",
    "elseif",
    "elsif",
    "end_trial",
    "ending",
    "fake_choice",
    "feedback",
    "finish",
    "gosub",
    "gosub_scene",
    "goto",
    "goto_random_scene",
    "goto_scene",
    "hide_reuse",
    "if",
    "ifid",
    "image",
    "input_number",
    "input_text",
    "label",
    "line_break",
    "link",
    "link_button",
    "looplimit",
    "more_games",
    "page_break",
    "params",
    "print",
    "product",
    "purchase",
    "purchase_discount",
    "rand",
    "redirect_scene",
    "reset",
    "restart",
    "restore_game",
    "restore_purchases",
    "return",
    "save_game",
    "scene_list",
    "selectable_if",
    "set",
    "share_this_game",
    "show_password",
    "sound",
    "stat_chart",
    "subscribe",
    "temp",
    "text_image",
    "title",
    "youtube",
];

pub const ARGUMENT_REQUIRED_COMMANDS: &[&str] = &[
    "achieve",
    "achievement",
    "create",
    "delete",
    "elseif",
    "elsif",
    "gosub",
    "gosub_scene",
    "goto",
    "goto_scene",
    "if",
    "image",
    "input_number",
    "input_text",
    "label",
    "params",
    "rand",
    "redirect_scene",
    "selectable_if",
    "set",
    "sound",
    "temp",
    "text_image",
];

pub const ARGUMENT_DISALLOWED_COMMANDS: &[&str] = &[
    "choice",
    "else",
    "fake_choice",
    "reset",
    "restart",
    "stat_chart",
];

pub const ARGUMENT_IGNORED_COMMANDS: &[&str] = &[
    "check_achievements",
    "ending",
    "line_break",
    "more_games",
    "return",
    "share_this_game",
    "show_password",
];

pub const STARTUP_COMMANDS: &[&str] = &[
    "achievement",
    "author",
    "create",
    "ifid",
    "product",
    "scene_list",
    "title",
];

/// Commands that may precede another command on an option line.
pub const REUSE_COMMANDS: &[&str] = &["allow_reuse", "disable_reuse", "hide_reuse"];

pub const BUILTIN_VARIABLES: &[&str] = &[
    "choice_randomtest",
    "choice_quicktest",
    "choice_restore_purchases_allowed",
    "choice_save_allowed",
    "choice_subscribe_allowed",
    "choice_register_allowed",
    "choice_registered",
    "choice_is_web",
    "choice_is_steam",
    "choice_is_ios_app",
    "choice_is_android_app",
    "choice_is_omnibus_app",
    "choice_is_amazon_app",
    "choice_is_advertising_supported",
    "choice_is_trial",
    "choice_release_date",
    "choice_prerelease",
    "choice_kindle",
    "choice_purchased_adfree",
    "choice_purchase_supported",
    "choice_title",
    "choice_nightmode",
    "implicit_control_flow",
];

pub const ACHIEVEMENT_VARIABLE_PREFIX: &str = "choice_achieved_";

pub const MAX_ACHIEVEMENTS: usize = 100;
pub const MAX_ACHIEVEMENT_POINTS: u32 = 1000;
pub const MAX_POINTS_PER_ACHIEVEMENT: u32 = 100;
pub const MAX_OPTION_WORDS: usize = 15;

/// How a command's symbols are handled once it has been recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCategory {
    SymbolCreating,
    SymbolReferencing,
    Condition,
    FlowControl,
    Block,
    Achievement,
    Image,
    CheckAchievements,
    Reuse,
    Comment,
    Other,
}

pub fn command_category(name: &str) -> CommandCategory {
    match name {
        "create" | "temp" | "label" | "params" => CommandCategory::SymbolCreating,
        "delete" | "rand" | "input_text" | "input_number" | "set" => {
            CommandCategory::SymbolReferencing
        }
        "if" | "elseif" | "elsif" | "selectable_if" => CommandCategory::Condition,
        "goto" | "gosub" | "goto_scene" | "gosub_scene" | "return" => CommandCategory::FlowControl,
        "choice" | "fake_choice" | "scene_list" | "stat_chart" => CommandCategory::Block,
        "achievement" | "achieve" => CommandCategory::Achievement,
        "image" | "text_image" => CommandCategory::Image,
        "check_achievements" => CommandCategory::CheckAchievements,
        "allow_reuse" | "disable_reuse" | "hide_reuse" => CommandCategory::Reuse,
        "comment" => CommandCategory::Comment,
        _ => CommandCategory::Other,
    }
}

pub fn is_valid_command(name: &str) -> bool {
    VALID_COMMANDS.contains(&name)
}

pub fn is_builtin_variable(name: &str) -> bool {
    BUILTIN_VARIABLES
        .iter()
        .any(|builtin| builtin.eq_ignore_ascii_case(name))
}

/// `param_count` or `param_<digits>`.
pub fn is_parameter_variable(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower == "param_count" {
        return true;
    }
    lower
        .strip_prefix("param_")
        .map(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// The codename behind a `choice_achieved_<codename>` variable.
pub fn achievement_codename(name: &str) -> Option<&str> {
    let prefix_len = ACHIEVEMENT_VARIABLE_PREFIX.len();
    if name.len() > prefix_len
        && name.is_char_boundary(prefix_len)
        && name[..prefix_len].eq_ignore_ascii_case(ACHIEVEMENT_VARIABLE_PREFIX)
    {
        Some(&name[prefix_len..])
    } else {
        None
    }
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

/// The type an expression (or one of its operands) evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalType {
    Number,
    String,
    Boolean,
    Empty,
    Unknown,
    Error,
}

impl EvalType {
    pub fn label(self) -> &'static str {
        match self {
            EvalType::Number => "a number",
            EvalType::String => "a string",
            EvalType::Boolean => "a boolean",
            EvalType::Empty => "empty",
            EvalType::Unknown => "unknown",
            EvalType::Error => "invalid",
        }
    }

    /// Whether a value of this type could stand where `expected` is required.
    pub fn satisfies(self, expected: ArgType) -> bool {
        match (self, expected) {
            (EvalType::Unknown, _) | (EvalType::Error, _) => true,
            (_, ArgType::Any) => self != EvalType::Empty,
            (EvalType::Number, ArgType::Number)
            | (EvalType::String, ArgType::String)
            | (EvalType::Boolean, ArgType::Boolean) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Number,
    String,
    Boolean,
    Any,
}

impl ArgType {
    pub fn label(self) -> &'static str {
        match self {
            ArgType::Number => "a number",
            ArgType::String => "a string",
            ArgType::Boolean => "a boolean",
            ArgType::Any => "a value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    FairAdd,
    FairSubtract,
    Modulo,
    Concatenate,
    CharacterAt,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    And,
    Or,
}

/// Symbolic operators, longest first so greedy matching works.
const SYMBOL_OPERATORS: &[(&str, Operator)] = &[
    ("%+", Operator::FairAdd),
    ("%-", Operator::FairSubtract),
    ("<=", Operator::LessOrEqual),
    (">=", Operator::GreaterOrEqual),
    ("!=", Operator::NotEqual),
    ("+", Operator::Add),
    ("-", Operator::Subtract),
    ("*", Operator::Multiply),
    ("/", Operator::Divide),
    ("&", Operator::Concatenate),
    ("#", Operator::CharacterAt),
    ("=", Operator::Equal),
    ("<", Operator::Less),
    (">", Operator::Greater),
];

pub const OPERATOR_CHARACTERS: &str = "+-*/&#=<>!%";

impl Operator {
    /// Match the longest symbolic operator at the start of `text`.
    pub fn match_symbol(text: &str) -> Option<(Operator, usize)> {
        SYMBOL_OPERATORS
            .iter()
            .find(|(symbol, _)| text.starts_with(symbol))
            .map(|(symbol, op)| (*op, symbol.len()))
    }

    pub fn from_word(word: &str) -> Option<Operator> {
        match word.to_ascii_lowercase().as_str() {
            "and" => Some(Operator::And),
            "or" => Some(Operator::Or),
            "modulo" => Some(Operator::Modulo),
            _ => None,
        }
    }

    pub fn signature(self) -> (ArgType, ArgType, EvalType) {
        match self {
            Operator::Add
            | Operator::Subtract
            | Operator::Multiply
            | Operator::Divide
            | Operator::FairAdd
            | Operator::FairSubtract
            | Operator::Modulo => (ArgType::Number, ArgType::Number, EvalType::Number),
            Operator::Concatenate => (ArgType::Any, ArgType::Any, EvalType::String),
            Operator::CharacterAt => (ArgType::String, ArgType::Number, EvalType::String),
            Operator::Less
            | Operator::Greater
            | Operator::LessOrEqual
            | Operator::GreaterOrEqual => (ArgType::Number, ArgType::Number, EvalType::Boolean),
            Operator::Equal | Operator::NotEqual => {
                (ArgType::Any, ArgType::Any, EvalType::Boolean)
            }
            Operator::And | Operator::Or => (ArgType::Boolean, ArgType::Boolean, EvalType::Boolean),
        }
    }

    /// Equality needs both sides to agree, whatever their type.
    pub fn requires_matching_operands(self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Not,
    Round,
    Timestamp,
    Log,
    Length,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Function> {
        match name.to_ascii_lowercase().as_str() {
            "not" => Some(Function::Not),
            "round" => Some(Function::Round),
            "timestamp" => Some(Function::Timestamp),
            "log" => Some(Function::Log),
            "length" => Some(Function::Length),
            _ => None,
        }
    }

    pub fn signature(self) -> (ArgType, EvalType) {
        match self {
            Function::Not => (ArgType::Boolean, EvalType::Boolean),
            Function::Round | Function::Log => (ArgType::Number, EvalType::Number),
            Function::Timestamp | Function::Length => (ArgType::String, EvalType::Number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tables_only_name_valid_commands() {
        for table in [
            ARGUMENT_REQUIRED_COMMANDS,
            ARGUMENT_DISALLOWED_COMMANDS,
            ARGUMENT_IGNORED_COMMANDS,
            STARTUP_COMMANDS,
            REUSE_COMMANDS,
        ] {
            for name in table {
                assert!(is_valid_command(name), "{} is not a valid command", name);
            }
        }
    }

    #[test]
    fn recognizes_pseudo_scope_names() {
        assert!(is_parameter_variable("param_1"));
        assert!(is_parameter_variable("PARAM_count"));
        assert!(!is_parameter_variable("param_"));
        assert!(!is_parameter_variable("param_x"));
        assert_eq!(achievement_codename("choice_achieved_hero"), Some("hero"));
        assert_eq!(achievement_codename("choice_achieved_"), None);
    }

    #[test]
    fn matches_longest_operator_first() {
        assert_eq!(Operator::match_symbol("<= 3"), Some((Operator::LessOrEqual, 2)));
        assert_eq!(Operator::match_symbol("%+10"), Some((Operator::FairAdd, 2)));
        assert_eq!(Operator::match_symbol("%"), None);
    }
}
