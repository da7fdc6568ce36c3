use crate::grammar;

pub fn parse(
    input: &str,
) -> Result<Module, lalrpop_util::ParseError<usize, lalrpop_util::lexer::Token, &str>> {
    grammar::ModuleParser::new().parse(input)
}

#[derive(Debug, PartialEq, Eq)]
pub struct Module {
    pub functions: Vec<Function>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Function {
    pub name: Identifier,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Instruction {
    Const(Identifier, i64),
    Add(Identifier, Operand, Operand),
    Sub(Identifier, Operand, Operand),
    Mul(Identifier, Operand, Operand),
    Div(Identifier, Operand, Operand),
    Mod(Identifier, Operand, Operand),
    Phi(Identifier, Vec<Operand>),
    Ret(Operand),
}

impl Instruction {
    /// The value defined by this instruction, if any.
    pub fn defines(&self) -> Option<&Identifier> {
        match self {
            Self::Const(id, _)
            | Self::Add(id, ..)
            | Self::Sub(id, ..)
            | Self::Mul(id, ..)
            | Self::Div(id, ..)
            | Self::Mod(id, ..)
            | Self::Phi(id, _) => Some(id),
            Self::Ret(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    Value(Identifier),
}

pub type Identifier = String;

#[cfg(test)]
mod tests {
    use crate::{
        grammar,
        module::{
            Function,
            Instruction,
            Operand,
        },
    };

    #[test]
    fn should_parse_function() {
        let function = grammar::FunctionParser::new()
            .parse(
                r"
fun main {
    %0 = const 3;
    %1 = const 4;
    %2 = add %0, %1;
    %3 = div %2, 2;
    ret %3;
}
        ",
            )
            .unwrap();
        assert_eq!(
            function,
            Function {
                name: "main".to_string(),
                instructions: vec![
                    Instruction::Const("0".to_string(), 3),
                    Instruction::Const("1".to_string(), 4),
                    Instruction::Add(
                        "2".to_string(),
                        Operand::Value("0".to_string()),
                        Operand::Value("1".to_string())
                    ),
                    Instruction::Div(
                        "3".to_string(),
                        Operand::Value("2".to_string()),
                        Operand::Literal(2)
                    ),
                    Instruction::Ret(Operand::Value("3".to_string())),
                ],
            }
        )
    }

    #[test]
    fn should_parse_phi_and_comments() {
        let module = crate::parse(
            r"
// two functions in one file
fun first {
    %a = const -1;
    %b = phi %a, 7, %a;
    ret %b;
}

fun second {
    ret 0;
}
        ",
        )
        .unwrap();
        assert_eq!(module.functions.len(), 2);
        assert_eq!(
            module.functions[0].instructions[1],
            Instruction::Phi(
                "b".to_string(),
                vec![
                    Operand::Value("a".to_string()),
                    Operand::Literal(7),
                    Operand::Value("a".to_string()),
                ]
            )
        );
        assert_eq!(
            module.functions[1].instructions,
            vec![Instruction::Ret(Operand::Literal(0))]
        );
    }

    #[test]
    fn should_reject_missing_semicolon() {
        assert!(crate::parse("fun main { ret 0 }").is_err());
    }

    #[test]
    fn should_reject_out_of_range_literal() {
        assert!(crate::parse("fun main { ret 99999999999999999999; }").is_err());
    }
}
