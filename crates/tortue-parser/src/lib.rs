pub mod parser;

pub use parser::Parser;

#[cfg(test)]
mod tests {
    use super::*;
    use tortue_lexer::Lexer;
    use tortue_syntax::ast::*;

    fn parse_expr_str(input: &str) -> Expr {
        let (tokens, diagnostics) = Lexer::new(input).tokenize();
        assert!(diagnostics.is_empty(), "Lexing should succeed");
        let mut parser = Parser::new(tokens);
        parser.parse_expr().expect("Parsing should succeed")
    }

    fn parse_program_str(input: &str) -> Block {
        let (tokens, diagnostics) = Lexer::new(input).tokenize();
        assert!(diagnostics.is_empty(), "Lexing should succeed");
        let mut parser = Parser::new(tokens);
        parser.parse_program().expect("Parsing should succeed")
    }

    #[test]
    fn test_literal_expressions() {
        assert!(matches!(parse_expr_str("42"), Expr::Number(n) if n == 42.0));
        assert!(matches!(parse_expr_str("2.5"), Expr::Number(n) if n == 2.5));
        assert!(matches!(parse_expr_str("\"hello\""), Expr::Word(s) if s == "hello"));
        assert!(matches!(parse_expr_str("true"), Expr::Bool(true)));
        assert!(matches!(parse_expr_str("false"), Expr::Bool(false)));
    }

    #[test]
    fn test_variable_references() {
        assert!(matches!(parse_expr_str(":size"), Expr::Variable(s) if s == "size"));
    }

    #[test]
    fn test_binary_arithmetic() {
        assert!(matches!(parse_expr_str("1 + 2"), Expr::Binary(BinOp::Add, _, _)));
        assert!(matches!(parse_expr_str("5 - 3"), Expr::Binary(BinOp::Sub, _, _)));
        assert!(matches!(parse_expr_str("4 * 6"), Expr::Binary(BinOp::Mul, _, _)));
        assert!(matches!(parse_expr_str("8 / 2"), Expr::Binary(BinOp::Div, _, _)));
        assert!(matches!(parse_expr_str("2 ^ 3"), Expr::Binary(BinOp::Pow, _, _)));
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        // 2 + 3 * 4 parses as 2 + (3 * 4)
        let Expr::Binary(BinOp::Add, lhs, rhs) = parse_expr_str("2 + 3 * 4") else {
            panic!("Expected Add at the top");
        };
        assert!(matches!(*lhs, Expr::Number(n) if n == 2.0));
        assert!(matches!(*rhs, Expr::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        // -2 ^ 2 parses as -(2 ^ 2)
        let Expr::Unary(UnOp::Neg, operand) = parse_expr_str("-2 ^ 2") else {
            panic!("Expected Neg at the top");
        };
        assert!(matches!(*operand, Expr::Binary(BinOp::Pow, _, _)));
    }

    #[test]
    fn test_power_is_left_associative() {
        // 2 ^ 3 ^ 2 parses as (2 ^ 3) ^ 2
        let Expr::Binary(BinOp::Pow, lhs, rhs) = parse_expr_str("2 ^ 3 ^ 2") else {
            panic!("Expected Pow at the top");
        };
        assert!(matches!(*lhs, Expr::Binary(BinOp::Pow, _, _)));
        assert!(matches!(*rhs, Expr::Number(n) if n == 2.0));
    }

    #[test]
    fn test_sqrt_sits_between_additive_and_multiplicative() {
        // sqrt 4 + 5 parses as (sqrt 4) + 5
        let Expr::Binary(BinOp::Add, lhs, _) = parse_expr_str("sqrt 4 + 5") else {
            panic!("Expected Add at the top");
        };
        assert!(matches!(*lhs, Expr::Builtin(ExprBuiltin::Sqrt, _)));

        // sqrt 4 * 5 parses as sqrt (4 * 5)
        let Expr::Builtin(ExprBuiltin::Sqrt, args) = parse_expr_str("sqrt 4 * 5") else {
            panic!("Expected Sqrt at the top");
        };
        assert!(matches!(args[0], Expr::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn test_random_binds_loosest() {
        // random 5 + 3 parses as random (5 + 3)
        let Expr::Builtin(ExprBuiltin::Random, args) = parse_expr_str("random 5 + 3") else {
            panic!("Expected Random at the top");
        };
        assert!(matches!(args[0], Expr::Binary(BinOp::Add, _, _)));
    }

    #[test]
    fn test_comparison_operations() {
        assert!(matches!(parse_expr_str("1 == 2"), Expr::Comparison(CmpOp::Eq, _, _)));
        assert!(matches!(parse_expr_str("1 != 2"), Expr::Comparison(CmpOp::Neq, _, _)));
        assert!(matches!(parse_expr_str("1 < 2"), Expr::Comparison(CmpOp::Lt, _, _)));
        assert!(matches!(parse_expr_str("1 <= 2"), Expr::Comparison(CmpOp::Lte, _, _)));
        assert!(matches!(parse_expr_str("1 > 2"), Expr::Comparison(CmpOp::Gt, _, _)));
        assert!(matches!(parse_expr_str("1 >= 2"), Expr::Comparison(CmpOp::Gte, _, _)));
    }

    #[test]
    fn test_logical_operations() {
        assert!(matches!(
            parse_expr_str(":a > 1 and :b < 2"),
            Expr::Logical(LogicOp::And, _)
        ));
        assert!(matches!(
            parse_expr_str(":a > 1 or :b < 2"),
            Expr::Logical(LogicOp::Or, _)
        ));
        let Expr::Logical(LogicOp::Not, operands) = parse_expr_str("not :a > 1") else {
            panic!("Expected Not at the top");
        };
        assert_eq!(operands.len(), 1);
    }

    #[test]
    fn test_parenthesized_expressions() {
        assert!(matches!(parse_expr_str("(1 + 2)"), Expr::Binary(BinOp::Add, _, _)));
        // Parens always win: (2 + 3) * 4 groups the addition
        let Expr::Binary(BinOp::Mul, lhs, _) = parse_expr_str("(2 + 3) * 4") else {
            panic!("Expected Mul at the top");
        };
        assert!(matches!(*lhs, Expr::Binary(BinOp::Add, _, _)));
    }

    #[test]
    fn test_turtle_statements() {
        let block = parse_program_str("forward 50 right 90 penup home");
        assert_eq!(block.stmts.len(), 4);
        assert!(matches!(
            &block.stmts[0],
            Stmt::Turtle { op: TurtleOp::Forward, args } if args.len() == 1
        ));
        assert!(matches!(
            &block.stmts[2],
            Stmt::Turtle { op: TurtleOp::PenUp, args } if args.is_empty()
        ));
    }

    #[test]
    fn test_setxy_uses_braces() {
        let block = parse_program_str("setxy{10, 20}");
        assert!(matches!(
            &block.stmts[0],
            Stmt::Turtle { op: TurtleOp::SetXy, args } if args.len() == 2
        ));
    }

    #[test]
    fn test_if_then_else() {
        let block = parse_program_str("if (:x > 0) then forward 1 else back 1 end");
        let Stmt::If { cond, then_block, else_block } = &block.stmts[0] else {
            panic!("Expected If");
        };
        assert!(matches!(cond, Expr::Comparison(CmpOp::Gt, _, _)));
        assert_eq!(then_block.stmts.len(), 1);
        assert_eq!(else_block.as_ref().unwrap().stmts.len(), 1);
    }

    #[test]
    fn test_while_loop() {
        let block = parse_program_str("while (:i < 5) forward :i end");
        let Stmt::While { cond, body } = &block.stmts[0] else {
            panic!("Expected While");
        };
        assert!(matches!(cond, Expr::Comparison(CmpOp::Lt, _, _)));
        assert_eq!(body.stmts.len(), 1);
    }

    #[test]
    fn test_assignment_forms() {
        assert!(matches!(
            &parse_program_str("i = 0").stmts[0],
            Stmt::Assign { name, .. } if name == "i"
        ));
        assert!(matches!(
            &parse_program_str(":i = :i + 1").stmts[0],
            Stmt::Assign { name, .. } if name == "i"
        ));
    }

    #[test]
    fn test_procedure_definition() {
        let block = parse_program_str("to square :x write :x * :x end");
        let Stmt::ProcDef { name, params, body } = &block.stmts[0] else {
            panic!("Expected ProcDef");
        };
        assert_eq!(name, "square");
        assert_eq!(params, &vec!["x".to_string()]);
        assert_eq!(body.stmts.len(), 1);
    }

    #[test]
    fn test_procedure_params_allow_commas() {
        let block = parse_program_str("to jump :x, :y setxy{:x, :y} end");
        let Stmt::ProcDef { params, .. } = &block.stmts[0] else {
            panic!("Expected ProcDef");
        };
        assert_eq!(params, &vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_duplicate_parameter_is_rejected() {
        let (tokens, _) = Lexer::new("to p :x :x end").tokenize();
        let errs = Parser::new(tokens).parse_program().unwrap_err();
        assert!(errs[0].msg.contains("Duplicate parameter"));
    }

    #[test]
    fn test_procedure_call_args_are_greedy() {
        let block = parse_program_str("square 1 2");
        let Stmt::ProcCall { name, args } = &block.stmts[0] else {
            panic!("Expected ProcCall");
        };
        assert_eq!(name, "square");
        assert_eq!(args.len(), 2);

        // A full expression is one argument
        let block = parse_program_str("square :n - 1");
        let Stmt::ProcCall { args, .. } = &block.stmts[0] else {
            panic!("Expected ProcCall");
        };
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_call_args_stop_before_an_assignment() {
        // `square 20 :i = :i + 1` is a one-argument call and an assignment
        let block = parse_program_str("square 20 :i = :i + 1");
        assert_eq!(block.stmts.len(), 2);
        let Stmt::ProcCall { args, .. } = &block.stmts[0] else {
            panic!("Expected ProcCall");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(&block.stmts[1], Stmt::Assign { name, .. } if name == "i"));
    }

    #[test]
    fn test_write_statement() {
        assert!(matches!(
            &parse_program_str("write \"hello\"").stmts[0],
            Stmt::Write(Expr::Word(w)) if w == "hello"
        ));
        assert!(matches!(
            &parse_program_str("write :x * :x").stmts[0],
            Stmt::Write(Expr::Binary(BinOp::Mul, _, _))
        ));
    }

    #[test]
    fn test_semicolons_separate_statements() {
        let block = parse_program_str("i = 0; forward :i; penup");
        assert_eq!(block.stmts.len(), 3);
    }

    #[test]
    fn test_recovery_reports_multiple_diagnostics() {
        let (tokens, _) = Lexer::new("forward + \n penup \n back *").tokenize();
        let errs = Parser::new(tokens).parse_program().unwrap_err();
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().all(|e| e.kind == tortue_syntax::ErrorKind::Syntax));
    }

    #[test]
    fn test_xcor_is_an_expression_and_a_statement() {
        assert!(matches!(
            parse_expr_str("xcor + 1"),
            Expr::Binary(BinOp::Add, _, _)
        ));
        assert!(matches!(
            &parse_program_str("xcor").stmts[0],
            Stmt::Turtle { op: TurtleOp::XCor, .. }
        ));
    }
}
