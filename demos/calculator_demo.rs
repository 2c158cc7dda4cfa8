use std::collections::BTreeMap;

use lextab::ast::{CharRange, PatternNode};
use lextab::scanner::{Scanner, ScannerTables};
use lextab::{compile, ActionId, ConditionSet, Rule, ScannerSpec};

const TOKEN_NAMES: &[&str] = &[
    "HEX", "OCT", "BIN", "INT", "IDENT", "ASSIGN", "PLUS", "MINUS", "LPAREN", "RPAREN", "WS",
];
const WS: ActionId = 10;

fn span(lo: char, hi: char) -> CharRange {
    CharRange::new(lo as u32, hi as u32)
}

fn plus(node: PatternNode) -> PatternNode {
    PatternNode::Quantified { node: Box::new(node), min: 1, max: None }
}

fn rule(pattern: PatternNode, action: ActionId) -> Rule {
    Rule { pattern, conditions: ConditionSet::All, action, action_type: None }
}

/// Tokens for a calculator language: multi-base integer literals,
/// identifiers, assignment, additive operators, and parentheses.
fn calculator_spec() -> ScannerSpec {
    let mut macros = BTreeMap::new();
    macros.insert("DIGIT".to_string(), PatternNode::class(vec![span('0', '9')]));
    macros.insert(
        "HEXDIGIT".to_string(),
        PatternNode::class(vec![span('0', '9'), span('a', 'f'), span('A', 'F')]),
    );

    let hex = PatternNode::Concatenation(vec![
        PatternNode::literal("0x"),
        plus(PatternNode::MacroRef("HEXDIGIT".to_string())),
    ]);
    let oct = PatternNode::Concatenation(vec![
        PatternNode::literal("0o"),
        plus(PatternNode::class(vec![span('0', '7')])),
    ]);
    let bin = PatternNode::Concatenation(vec![
        PatternNode::literal("0b"),
        plus(PatternNode::class(vec![span('0', '1')])),
    ]);
    let int = plus(PatternNode::MacroRef("DIGIT".to_string()));
    let ident = PatternNode::Concatenation(vec![
        PatternNode::class(vec![span('a', 'z'), span('A', 'Z'), CharRange::single('_' as u32)]),
        PatternNode::Quantified {
            node: Box::new(PatternNode::class(vec![
                span('a', 'z'),
                span('A', 'Z'),
                span('0', '9'),
                CharRange::single('_' as u32),
            ])),
            min: 0,
            max: None,
        },
    ]);
    let ws = plus(PatternNode::class(vec![
        CharRange::single(' ' as u32),
        CharRange::single('\t' as u32),
        CharRange::single('\n' as u32),
    ]));

    let mut rules = vec![rule(hex, 0), rule(oct, 1), rule(bin, 2), rule(int, 3), rule(ident, 4)];
    for (action, op) in [(5, "="), (6, "+"), (7, "-"), (8, "("), (9, ")")] {
        rules.push(rule(PatternNode::literal(op), action));
    }
    rules.push(rule(ws, WS));

    ScannerSpec {
        name: "Calculator".to_string(),
        conditions: Vec::new(),
        macros,
        rules,
    }
}

fn show_tokens(tables: &ScannerTables, input: &str) {
    let mut scanner = Scanner::new(tables, input);
    print!("  {:<18} => ", input);
    loop {
        match scanner.next_token() {
            Ok(Some(token)) if token.action == WS => continue,
            Ok(Some(token)) => {
                let lexeme = &input[token.span.start..token.span.end];
                print!("{}({}) ", TOKEN_NAMES[token.action as usize], lexeme);
            },
            Ok(None) => break,
            Err(e) => {
                print!("{}", e);
                break;
            },
        }
    }
    println!();
}

fn main() {
    let spec = calculator_spec();
    let output = compile(&spec);
    for diagnostic in &output.diagnostics {
        println!("{}", diagnostic);
    }
    let Some(compiled) = output.scanner else {
        println!("compilation produced no tables");
        return;
    };
    println!(
        "compiled '{}': {} rules, {} NFA states, {} minimized DFA states, {} character classes",
        compiled.name,
        output.stats.rule_count,
        output.stats.nfa_states,
        output.stats.min_dfa_states,
        output.stats.alphabet_size
    );

    let tables = match ScannerTables::decode(&compiled) {
        Ok(tables) => tables,
        Err(e) => {
            println!("table decode failed: {}", e);
            return;
        },
    };

    println!("\n=== Simple arithmetic expressions ===");
    for input in ["3", "3 + 3", "5-2", "1+2-3", "(1+2)-3"] {
        show_tokens(&tables, input);
    }

    println!("\n=== Variable assignment ===");
    for input in ["x = 3 + 2", "y = 10 - 1", "myVar = 100", "myVar - x - y"] {
        show_tokens(&tables, input);
    }

    println!("\n=== Multi-base integer literals ===");
    for input in ["0xFF", "0x4A", "0o77", "0b1111", "0x10 + 0o10", "0xFF - 0b11"] {
        show_tokens(&tables, input);
    }

    println!("\n=== Scan errors ===");
    for input in ["price@3", "9 % 2"] {
        show_tokens(&tables, input);
    }
}
