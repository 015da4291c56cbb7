use std::rc::Rc;

use pest::iterators::Pair;
use pest_consume::{match_nodes, Error, Parser};

use super::ast::*;

#[derive(Parser)]
#[grammar = "parser/java_grammar.pest"] // relative to src
pub struct JavaParser;

pub type ParseError = Error<Rule>;
type Result<T> = std::result::Result<T, ParseError>;
type Node<'i> = pest_consume::Node<'i, Rule, ()>;

const TAB_WIDTH: usize = 2;

impl JavaParser {
    /// Parses a whole source file into a compilation unit.
    pub fn parse_compilation_unit(source: &str) -> Result<CompilationUnit> {
        let inputs = JavaParser::parse(Rule::compilation_unit, source)?;
        let input = inputs.single()?;
        JavaParser::compilation_unit(input)
    }

    /// Parses a single expression, e.g. `1 + 2 * 3`.
    pub fn parse_expression(source: &str) -> Result<Rc<Expression>> {
        let inputs = JavaParser::parse(Rule::expression_entry, source)?;
        let input = inputs.single()?;
        JavaParser::expression_entry(input)
    }

    /// Renders the raw parse tree, one rule per line, for debugging the grammar.
    pub fn parse_to_token_tree(source: &str) -> Result<String> {
        let inputs = JavaParser::parse(Rule::compilation_unit, source)?;
        let mut tree = vec![];
        for input in inputs {
            tree.push(pair_to_string(input.as_pair().clone(), 0).join("\n"));
        }
        Ok(tree.join("\n"))
    }
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    tree.push(format!(
        "{}{:?} => ({},{}) #{:?}",
        " ".repeat(level * TAB_WIDTH),
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    ));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}

fn get_unexpected_error(node: &Node) -> ParseError {
    node.error(format!("Unexpected rule {:?}", node.as_rule()))
}

#[pest_consume::parser]
impl JavaParser {
    fn compilation_unit(input: Node) -> Result<CompilationUnit> {
        let mut classes = vec![];
        for child in input.into_children() {
            match child.as_rule() {
                Rule::class_declaration => {
                    classes.push(Rc::new(JavaParser::class_declaration(child)?))
                }
                Rule::EOI => { /* Do nothing */ }
                _ => return Err(get_unexpected_error(&child)),
            }
        }
        Ok(CompilationUnit { classes })
    }

    fn class_declaration(input: Node) -> Result<ClassDeclaration> {
        let mut modifiers = vec![];
        let mut name = None;
        let mut superclass = None;
        let mut body = vec![];
        for child in input.into_children() {
            match child.as_rule() {
                Rule::modifier => modifiers.push(JavaParser::modifier(child)?),
                Rule::identifier => name = Some(JavaParser::identifier(child)?),
                Rule::superclass => superclass = Some(JavaParser::superclass(child)?),
                Rule::field_declaration => body.push(ClassBodyDeclaration::Field(Rc::new(
                    JavaParser::field_declaration(child)?,
                ))),
                Rule::method_declaration => body.push(ClassBodyDeclaration::Method(Rc::new(
                    JavaParser::method_declaration(child)?,
                ))),
                Rule::constructor_declaration => body.push(ClassBodyDeclaration::Constructor(
                    Rc::new(JavaParser::constructor_declaration(child)?),
                )),
                _ => return Err(get_unexpected_error(&child)),
            }
        }
        Ok(ClassDeclaration {
            modifiers,
            name: name.unwrap_or_default(),
            superclass,
            body,
        })
    }

    fn superclass(input: Node) -> Result<String> {
        Ok(match_nodes!(input.into_children();
            [identifier(name)] => name,
        ))
    }

    fn modifier(input: Node) -> Result<Modifier> {
        Modifier::from_keyword(input.as_str())
            .ok_or_else(|| input.error(format!("Unknown modifier {}", input.as_str())))
    }

    fn identifier(input: Node) -> Result<String> {
        Ok(input.as_str().to_string())
    }

    fn unann_type(input: Node) -> Result<TypeName> {
        Ok(input.as_str().to_string())
    }

    fn result_type(input: Node) -> Result<TypeName> {
        Ok(input.as_str().to_string())
    }

    fn array_type(input: Node) -> Result<TypeName> {
        Ok(input.as_str().trim_end_matches("[]").to_string())
    }

    fn field_declaration(input: Node) -> Result<FieldDeclaration> {
        let mut modifiers = vec![];
        let mut field_type = String::new();
        let mut declarators = vec![];
        for child in input.into_children() {
            match child.as_rule() {
                Rule::modifier => modifiers.push(JavaParser::modifier(child)?),
                Rule::unann_type => field_type = JavaParser::unann_type(child)?,
                Rule::variable_declarator => {
                    declarators.push(JavaParser::variable_declarator(child)?)
                }
                _ => return Err(get_unexpected_error(&child)),
            }
        }
        Ok(FieldDeclaration {
            modifiers,
            field_type,
            declarators,
        })
    }

    fn variable_declarator(input: Node) -> Result<VariableDeclarator> {
        Ok(match_nodes!(input.into_children();
            [identifier(name)] => VariableDeclarator { name, initializer: None },
            [identifier(name), expression(init)] => VariableDeclarator {
                name,
                initializer: Some(init),
            },
        ))
    }

    fn method_declaration(input: Node) -> Result<MethodDeclaration> {
        let mut modifiers = vec![];
        let mut result_type = String::new();
        let mut name = String::new();
        let mut params = vec![];
        let mut body = None;
        for child in input.into_children() {
            match child.as_rule() {
                Rule::modifier => modifiers.push(JavaParser::modifier(child)?),
                Rule::result_type => result_type = JavaParser::result_type(child)?,
                Rule::identifier => name = JavaParser::identifier(child)?,
                Rule::formal_parameters => params = JavaParser::formal_parameters(child)?,
                Rule::block => body = Some(JavaParser::block(child)?),
                Rule::empty_body => body = None,
                _ => return Err(get_unexpected_error(&child)),
            }
        }
        Ok(MethodDeclaration {
            modifiers,
            result_type,
            name,
            params,
            body,
        })
    }

    fn empty_body(_input: Node) -> Result<()> {
        Ok(())
    }

    fn constructor_declaration(input: Node) -> Result<ConstructorDeclaration> {
        let mut modifiers = vec![];
        let mut name = String::new();
        let mut params = vec![];
        let mut body = Block::default();
        for child in input.into_children() {
            match child.as_rule() {
                Rule::modifier => modifiers.push(JavaParser::modifier(child)?),
                Rule::identifier => name = JavaParser::identifier(child)?,
                Rule::formal_parameters => params = JavaParser::formal_parameters(child)?,
                Rule::constructor_body => body = JavaParser::constructor_body(child)?,
                _ => return Err(get_unexpected_error(&child)),
            }
        }
        Ok(ConstructorDeclaration {
            modifiers,
            name,
            params,
            body,
        })
    }

    fn constructor_body(input: Node) -> Result<Block> {
        let mut statements = vec![];
        for child in input.into_children() {
            statements.push(Rc::new(block_statement(child)?));
        }
        Ok(Block { statements })
    }

    fn explicit_constructor_invocation(input: Node) -> Result<ExplicitConstructorInvocation> {
        Ok(match_nodes!(input.into_children();
            [this_or_super(this_or_super), arguments(arguments)] => ExplicitConstructorInvocation {
                this_or_super,
                arguments,
            },
        ))
    }

    fn this_or_super(input: Node) -> Result<ThisOrSuper> {
        match input.as_str() {
            "this" => Ok(ThisOrSuper::This),
            "super" => Ok(ThisOrSuper::Super),
            other => Err(input.error(format!("Expected this or super, found {}", other))),
        }
    }

    fn formal_parameters(input: Node) -> Result<Vec<FormalParameter>> {
        Ok(match_nodes!(input.into_children();
            [formal_parameter(params)..] => params.collect(),
        ))
    }

    fn formal_parameter(input: Node) -> Result<FormalParameter> {
        Ok(match_nodes!(input.into_children();
            [unann_type(param_type), identifier(name)] => FormalParameter { param_type, name },
        ))
    }

    fn arguments(input: Node) -> Result<Vec<Rc<Expression>>> {
        Ok(match_nodes!(input.into_children();
            [expression(args)..] => args.collect(),
        ))
    }

    // ----- Statements -----

    fn block(input: Node) -> Result<Block> {
        let mut statements = vec![];
        for child in input.into_children() {
            statements.push(Rc::new(block_statement(child)?));
        }
        Ok(Block { statements })
    }

    fn local_variable_declaration_statement(input: Node) -> Result<LocalVariableDeclaration> {
        Ok(match_nodes!(input.into_children();
            [local_variable_declaration(decl)] => decl,
        ))
    }

    fn local_variable_declaration(input: Node) -> Result<LocalVariableDeclaration> {
        let mut local_type = String::new();
        let mut declarators = vec![];
        for child in input.into_children() {
            match child.as_rule() {
                Rule::unann_type => local_type = JavaParser::unann_type(child)?,
                Rule::variable_declarator => {
                    declarators.push(JavaParser::variable_declarator(child)?)
                }
                _ => return Err(get_unexpected_error(&child)),
            }
        }
        Ok(LocalVariableDeclaration {
            local_type,
            declarators,
        })
    }

    fn if_statement(input: Node) -> Result<Statement> {
        let mut children = input.clone().into_children();
        let condition = match children.next() {
            Some(c) => JavaParser::expression(c)?,
            None => return Err(input.error("If statement without condition")),
        };
        let consequent = match children.next() {
            Some(c) => Rc::new(block_statement(c)?),
            None => return Err(input.error("If statement without body")),
        };
        let alternative = match children.next() {
            Some(c) => Some(Rc::new(block_statement(c)?)),
            None => None,
        };
        Ok(Statement::If {
            condition,
            consequent,
            alternative,
        })
    }

    fn while_statement(input: Node) -> Result<Statement> {
        let mut children = input.clone().into_children();
        match (children.next(), children.next()) {
            (Some(condition), Some(body)) => Ok(Statement::While {
                condition: JavaParser::expression(condition)?,
                body: Rc::new(block_statement(body)?),
            }),
            _ => Err(input.error("Malformed while statement")),
        }
    }

    fn for_statement(input: Node) -> Result<Statement> {
        let mut init = vec![];
        let mut condition = None;
        let mut update = vec![];
        let mut body = None;
        for child in input.clone().into_children() {
            match child.as_rule() {
                Rule::for_init => init = JavaParser::for_init(child)?,
                Rule::expression => condition = Some(JavaParser::expression(child)?),
                Rule::for_update => update = JavaParser::for_update(child)?,
                _ => body = Some(Rc::new(block_statement(child)?)),
            }
        }
        match body {
            Some(body) => Ok(Statement::BasicFor {
                init,
                condition,
                update,
                body,
            }),
            None => Err(input.error("For statement without body")),
        }
    }

    fn for_init(input: Node) -> Result<Vec<Rc<Statement>>> {
        let mut init = vec![];
        for child in input.into_children() {
            match child.as_rule() {
                Rule::local_variable_declaration => init.push(Rc::new(
                    Statement::LocalVariableDeclaration(JavaParser::local_variable_declaration(
                        child,
                    )?),
                )),
                _ => init.push(Rc::new(Statement::Expression(expression_node(child)?))),
            }
        }
        Ok(init)
    }

    fn for_update(input: Node) -> Result<Vec<Rc<Statement>>> {
        let mut update = vec![];
        for child in input.into_children() {
            update.push(Rc::new(Statement::Expression(expression_node(child)?)));
        }
        Ok(update)
    }

    fn switch_statement(input: Node) -> Result<Statement> {
        Ok(match_nodes!(input.into_children();
            [expression(discriminant), switch_block_group(cases)..] => Statement::Switch {
                discriminant,
                cases: cases.collect(),
            },
        ))
    }

    fn switch_block_group(input: Node) -> Result<SwitchCase> {
        let mut labels = vec![];
        let mut statements = vec![];
        for child in input.into_children() {
            match child.as_rule() {
                Rule::case_label => labels.push(JavaParser::case_label(child)?),
                Rule::default_label => labels.push(SwitchLabel::Default),
                _ => statements.push(Rc::new(block_statement(child)?)),
            }
        }
        Ok(SwitchCase { labels, statements })
    }

    fn case_label(input: Node) -> Result<SwitchLabel> {
        Ok(match_nodes!(input.into_children();
            [expression(e)] => SwitchLabel::Case(e),
        ))
    }

    fn return_statement(input: Node) -> Result<Statement> {
        Ok(match_nodes!(input.into_children();
            [] => Statement::Return(None),
            [expression(e)] => Statement::Return(Some(e)),
        ))
    }

    fn expression_statement(input: Node) -> Result<Statement> {
        let mut children = input.clone().into_children();
        match children.next() {
            Some(child) => Ok(Statement::Expression(expression_node(child)?)),
            None => Err(input.error("Empty expression statement")),
        }
    }

    // ----- Expressions -----

    fn expression_entry(input: Node) -> Result<Rc<Expression>> {
        Ok(match_nodes!(input.into_children();
            [expression(e), EOI(_)] => e,
        ))
    }

    #[allow(non_snake_case)]
    fn EOI(_input: Node) -> Result<()> {
        Ok(())
    }

    fn expression(input: Node) -> Result<Rc<Expression>> {
        let mut children = input.clone().into_children();
        match children.next() {
            Some(child) => expression_node(child),
            None => Err(input.error("Empty expression")),
        }
    }

    fn assignment(input: Node) -> Result<Rc<Expression>> {
        Ok(match_nodes!(input.into_children();
            [expression_name(target), assignment_operator(op), expression(value)] => {
                Rc::new(match op {
                    None => Expression::Assignment { target, value },
                    Some(operator) => Expression::CompoundAssignment { operator, target, value },
                })
            },
        ))
    }

    /// `None` for plain `=`, the arithmetic operator for compound assignments.
    fn assignment_operator(input: Node) -> Result<Option<BinaryOperator>> {
        let symbol = input.as_str();
        if symbol == "=" {
            Ok(None)
        } else {
            BinaryOperator::from_symbol(symbol.trim_end_matches('='))
                .map(Some)
                .ok_or_else(|| input.error(format!("Unknown assignment operator {}", symbol)))
        }
    }

    fn unary_expression(input: Node) -> Result<Rc<Expression>> {
        let mut children = input.clone().into_children();
        match (children.next(), children.next()) {
            (Some(op), Some(operand)) => {
                let operator = JavaParser::unary_op(op)?;
                if let (UnaryOperator::Minus, Some(literal)) = (operator, negated_min(&operand)) {
                    return literal_node(literal);
                }
                Ok(Rc::new(Expression::Unary {
                    operator,
                    operand: expression_node(operand)?,
                }))
            }
            _ => Err(input.error("Malformed unary expression")),
        }
    }

    fn unary_op(input: Node) -> Result<UnaryOperator> {
        match input.as_str() {
            "-" => Ok(UnaryOperator::Minus),
            "+" => Ok(UnaryOperator::Plus),
            "!" => Ok(UnaryOperator::Not),
            other => Err(input.error(format!("Unknown unary operator {}", other))),
        }
    }

    fn increment_op(input: Node) -> Result<BinaryOperator> {
        match input.as_str() {
            "++" => Ok(BinaryOperator::Add),
            "--" => Ok(BinaryOperator::Subtract),
            other => Err(input.error(format!("Unknown increment operator {}", other))),
        }
    }

    fn pre_increment(input: Node) -> Result<Rc<Expression>> {
        Ok(match_nodes!(input.into_children();
            [increment_op(operator), expression_name(target)] => {
                Rc::new(Expression::Increment { operator, target, prefix: true })
            },
        ))
    }

    fn post_increment(input: Node) -> Result<Rc<Expression>> {
        Ok(match_nodes!(input.into_children();
            [expression_name(target), increment_op(operator)] => {
                Rc::new(Expression::Increment { operator, target, prefix: false })
            },
        ))
    }

    fn class_instance_creation(input: Node) -> Result<Rc<Expression>> {
        Ok(match_nodes!(input.into_children();
            [identifier(class_name), arguments(arguments)] => {
                Rc::new(Expression::ClassInstanceCreation { class_name, arguments })
            },
        ))
    }

    fn array_creation(input: Node) -> Result<Rc<Expression>> {
        Ok(match_nodes!(input.into_children();
            [array_type(element_type), expression(elements)..] => {
                Rc::new(Expression::ArrayCreation {
                    element_type,
                    elements: elements.collect(),
                })
            },
        ))
    }

    fn method_invocation(input: Node) -> Result<Rc<Expression>> {
        Ok(match_nodes!(input.into_children();
            [expression_name(name), arguments(arguments)] => {
                Rc::new(Expression::MethodInvocation { name, arguments })
            },
        ))
    }

    fn expression_name(input: Node) -> Result<String> {
        Ok(input.as_str().to_string())
    }

    // ----- Literals -----

    fn int_literal(input: Node) -> Result<Literal> {
        input
            .as_str()
            .parse::<i32>()
            .map(Literal::Int)
            .map_err(|e| input.error(e))
    }

    fn long_literal(input: Node) -> Result<Literal> {
        input
            .as_str()
            .trim_end_matches(|c| c == 'L' || c == 'l')
            .parse::<i64>()
            .map(Literal::Long)
            .map_err(|e| input.error(e))
    }

    fn double_literal(input: Node) -> Result<Literal> {
        input
            .as_str()
            .trim_end_matches(|c| c == 'd' || c == 'D')
            .parse::<f64>()
            .map(Literal::Double)
            .map_err(|e| input.error(e))
    }

    fn boolean_literal(input: Node) -> Result<Literal> {
        Ok(Literal::Boolean(input.as_str() == "true"))
    }

    fn null_literal(_input: Node) -> Result<Literal> {
        Ok(Literal::Null)
    }

    fn char_literal(input: Node) -> Result<Literal> {
        Ok(match_nodes!(input.into_children();
            [char_content(c)] => Literal::Char(c),
        ))
    }

    fn char_content(input: Node) -> Result<char> {
        unescape(input.as_str())
            .chars()
            .next()
            .ok_or_else(|| input.error("Empty character literal"))
    }

    fn string_literal(input: Node) -> Result<Literal> {
        Ok(match_nodes!(input.into_children();
            [string_content(s)] => Literal::String(s),
        ))
    }

    fn string_content(input: Node) -> Result<String> {
        Ok(unescape(input.as_str()))
    }
}

/// `2147483648` and `9223372036854775808L` are only valid as the operand of
/// unary minus.
fn negated_min(operand: &Node) -> Option<Literal> {
    match operand.as_rule() {
        Rule::int_literal if operand.as_str() == "2147483648" => Some(Literal::Int(i32::MIN)),
        Rule::long_literal
            if operand.as_str().trim_end_matches(|c| c == 'L' || c == 'l')
                == "9223372036854775808" =>
        {
            Some(Literal::Long(i64::MIN))
        }
        _ => None,
    }
}

fn block_statement(input: Node) -> Result<Statement> {
    Ok(match input.as_rule() {
        Rule::local_variable_declaration_statement => Statement::LocalVariableDeclaration(
            JavaParser::local_variable_declaration_statement(input)?,
        ),
        Rule::block => Statement::Block(JavaParser::block(input)?),
        Rule::if_statement => JavaParser::if_statement(input)?,
        Rule::while_statement => JavaParser::while_statement(input)?,
        Rule::for_statement => JavaParser::for_statement(input)?,
        Rule::switch_statement => JavaParser::switch_statement(input)?,
        Rule::return_statement => JavaParser::return_statement(input)?,
        Rule::break_statement => Statement::Break,
        Rule::continue_statement => Statement::Continue,
        Rule::empty_statement => Statement::Empty,
        Rule::expression_statement => JavaParser::expression_statement(input)?,
        Rule::explicit_constructor_invocation => Statement::ExplicitConstructorInvocation(
            JavaParser::explicit_constructor_invocation(input)?,
        ),
        _ => return Err(get_unexpected_error(&input)),
    })
}

/// Builds any expression-producing rule, folding binary operator chains left
/// to right.
fn expression_node(input: Node) -> Result<Rc<Expression>> {
    match input.as_rule() {
        Rule::expression => JavaParser::expression(input),
        Rule::assignment => JavaParser::assignment(input),
        Rule::conditional_or
        | Rule::conditional_and
        | Rule::equality
        | Rule::relational
        | Rule::additive
        | Rule::multiplicative => fold_binary(input),
        Rule::unary_expression => JavaParser::unary_expression(input),
        Rule::pre_increment => JavaParser::pre_increment(input),
        Rule::post_increment => JavaParser::post_increment(input),
        Rule::class_instance_creation => JavaParser::class_instance_creation(input),
        Rule::array_creation => JavaParser::array_creation(input),
        Rule::method_invocation => JavaParser::method_invocation(input),
        Rule::expression_name => Ok(Rc::new(Expression::Name(JavaParser::expression_name(
            input,
        )?))),
        Rule::int_literal => literal_node(JavaParser::int_literal(input)?),
        Rule::long_literal => literal_node(JavaParser::long_literal(input)?),
        Rule::double_literal => literal_node(JavaParser::double_literal(input)?),
        Rule::boolean_literal => literal_node(JavaParser::boolean_literal(input)?),
        Rule::null_literal => literal_node(JavaParser::null_literal(input)?),
        Rule::char_literal => literal_node(JavaParser::char_literal(input)?),
        Rule::string_literal => literal_node(JavaParser::string_literal(input)?),
        _ => Err(get_unexpected_error(&input)),
    }
}

fn literal_node(literal: Literal) -> Result<Rc<Expression>> {
    Ok(Rc::new(Expression::Literal(literal)))
}

fn fold_binary(input: Node) -> Result<Rc<Expression>> {
    let span_error = input.error("Malformed binary expression");
    let mut children = input.into_children();
    let mut left = match children.next() {
        Some(first) => expression_node(first)?,
        None => return Err(span_error),
    };
    while let Some(op) = children.next() {
        let operator = BinaryOperator::from_symbol(op.as_str())
            .ok_or_else(|| op.error(format!("Unknown operator {}", op.as_str())))?;
        let right = match children.next() {
            Some(operand) => expression_node(operand)?,
            None => return Err(op.error("Missing right operand")),
        };
        left = Rc::new(Expression::Binary {
            operator,
            left,
            right,
        });
    }
    Ok(left)
}

fn unescape(raw: &str) -> String {
    let mut s = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            s.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => s.push('\n'),
            Some('t') => s.push('\t'),
            Some('r') => s.push('\r'),
            Some('0') => s.push('\0'),
            Some(other) => s.push(other),
            None => s.push('\\'),
        }
    }
    s
}
