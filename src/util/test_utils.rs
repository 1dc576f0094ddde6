use crate::{
    diagnostic::Diagnostic,
    util::fmt::{tree, Context},
};

/// Each variant contains the input source.
pub enum Test {
    Parser(&'static str),
    Checker(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    fn format_errors(errors: &[Diagnostic]) -> Vec<String> {
        errors.iter().map(Diagnostic::with_span_display).collect()
    }

    let mut session = crate::Context::new();
    match test {
        Test::Parser(input) => {
            let scanned = crate::lex("<test>", input);
            let parsed = crate::parse(&mut session, scanned);
            let ctx = Context {
                idents: &session.interner,
                registry: &session.registry,
            };
            let tree = tree::print_program_string(&ctx, &parsed.program);
            (tree, format_errors(&parsed.errors))
        }
        Test::Checker(input) => {
            let scanned = crate::lex("<test>", input);
            let parsed = crate::parse(&mut session, scanned);
            let checked = crate::check(&mut session, parsed);
            let ctx = Context {
                idents: &session.interner,
                registry: &session.registry,
            };
            let tree = tree::print_program_string(&ctx, &checked.program);
            (tree, format_errors(&checked.errors))
        }
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let source = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser), $source:expr) => {
        crate::util::test_utils::Test::Parser($source)
    };
    (@@get_test(checker), $source:expr) => {
        crate::util::test_utils::Test::Checker($source)
    };
}
pub(crate) use tree_tests;
