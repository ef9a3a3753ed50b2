//! Reserved words
//!
//! The scanner hands every word to the parser as an identifier; the parser
//! consults this table to decide whether it starts a keyword form.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    Var,
    Function,
    Return,
    Out,
    New,
    This,
    True,
    False,
    Null,
    Lambda,
    Class,
    Throw,
}

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        match word {
            "if" => Some(Keyword::If),
            "else" => Some(Keyword::Else),
            "var" => Some(Keyword::Var),
            "function" => Some(Keyword::Function),
            "return" => Some(Keyword::Return),
            "out" => Some(Keyword::Out),
            "new" => Some(Keyword::New),
            "this" => Some(Keyword::This),
            "true" => Some(Keyword::True),
            "false" => Some(Keyword::False),
            "null" => Some(Keyword::Null),
            "lambda" => Some(Keyword::Lambda),
            "class" => Some(Keyword::Class),
            "throw" => Some(Keyword::Throw),
            _ => None,
        }
    }

    pub fn is_keyword(word: &str) -> bool {
        Self::lookup(word).is_some()
    }
}
