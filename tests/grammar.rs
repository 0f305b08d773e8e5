use serde::Deserialize;
use turtleshell::Parser;

#[derive(Deserialize)]
struct Corpus {
    case: Vec<Case>,
}

#[derive(Deserialize)]
struct Case {
    name: String,
    input: String,
    result: Option<String>,
}

fn corpus() -> Corpus {
    toml::from_str(include_str!("fixtures/parsing.toml")).unwrap()
}

#[test]
fn parse_trees_match_corpus() {
    let parser = Parser::new().unwrap();
    let corpus = corpus();
    assert!(!corpus.case.is_empty());
    for case in corpus.case {
        let outcome = parser.parse_tree(&case.input);
        match (case.result, outcome) {
            (Some(expected), Ok(tree)) => {
                assert_eq!(tree.pretty(), expected, "case {:?}", case.name)
            }
            (Some(_), Err(e)) => panic!("case {:?} failed to parse: {e}", case.name),
            (None, Ok(tree)) => panic!(
                "case {:?} should not parse, got\n{}",
                case.name,
                tree.pretty()
            ),
            (None, Err(_)) => {}
        }
    }
}

#[test]
fn typed_and_raw_parsers_agree_on_acceptance() {
    let parser = Parser::new().unwrap();
    for case in corpus().case {
        assert_eq!(
            parser.parse(&case.input).is_ok(),
            parser.parse_tree(&case.input).is_ok(),
            "case {:?}",
            case.name
        );
    }
}
