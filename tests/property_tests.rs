//! Property tests for renaming, rule precedence and conflict resolution.

use std::collections::HashSet;
use std::fs;

use dirshift::error::RenameError;
use dirshift::renamer::split_name;
use dirshift::rule_engine::{RuleSpec, compile};
use dirshift::{Action, CaseStyle, Config, OrganizeMode, Orchestrator, RenameMode, UndoManager};
use proptest::prelude::*;
use tempfile::TempDir;

fn rename_mode() -> impl Strategy<Value = RenameMode> {
    prop_oneof![
        ("[a-z]{1,3}", "[a-z_]{0,3}")
            .prop_map(|(find, replace)| RenameMode::FindReplace { find, replace }),
        "[a-z]{1,6}_\\{n\\}".prop_map(|template| RenameMode::Sequential { template }),
        prop_oneof![
            Just(CaseStyle::Lower),
            Just(CaseStyle::Upper),
            Just(CaseStyle::Title)
        ]
        .prop_map(RenameMode::Case),
        ("[a-z0-9_]{0,4}", "[a-z0-9_]{0,4}")
            .prop_filter("prefix or suffix", |(p, s)| !p.is_empty() || !s.is_empty())
            .prop_map(|(prefix, suffix)| RenameMode::Affix { prefix, suffix }),
    ]
}

proptest! {
    #[test]
    fn rename_preserves_extension(
        stem in "[A-Za-z0-9_ -]{1,12}",
        extension in "[A-Za-z0-9]{1,5}",
        mode in rename_mode(),
        sequence in 1usize..500,
    ) {
        let name = format!("{stem}.{extension}");
        match mode.apply(&name, sequence) {
            Ok(renamed) => {
                let (_, new_extension) = split_name(&renamed);
                prop_assert_eq!(new_extension, format!(".{extension}"));
            }
            Err(RenameError::EmptyName { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn sequential_names_are_unique_and_increasing(
        template in "[a-z]{1,6}_\\{n\\}",
        count in 1usize..60,
    ) {
        let mode = RenameMode::Sequential { template: template.clone() };
        let prefix = template.trim_end_matches("{n}");
        let mut seen = HashSet::new();
        let mut last = 0usize;
        for sequence in 1..=count {
            let renamed = mode.apply("file.dat", sequence).unwrap();
            let (stem, _) = split_name(&renamed);
            let number: usize = stem[prefix.len()..].parse().unwrap();
            prop_assert!(number > last);
            last = number;
            prop_assert!(seen.insert(renamed));
        }
    }

    #[test]
    fn first_rule_by_priority_then_declaration_wins(
        priorities in prop::collection::vec(-5i64..5, 1..8),
    ) {
        let specs: Vec<RuleSpec> = priorities
            .iter()
            .enumerate()
            .map(|(i, p)| RuleSpec::new(&format!("rule{i}"), "*.txt", &format!("Dir{i}"), *p))
            .collect();
        let compiled = compile(&specs);
        prop_assert!(compiled.errors.is_empty());

        let expected = priorities
            .iter()
            .enumerate()
            .min_by_key(|(i, p)| (**p, *i))
            .map(|(i, _)| format!("rule{i}"))
            .unwrap();
        let rule = compiled.matcher.resolve("notes.txt").unwrap();
        prop_assert_eq!(&rule.name, &expected);
    }

    #[test]
    fn invalid_rules_never_hide_valid_ones(
        valid in prop::collection::vec(any::<bool>(), 1..10),
    ) {
        let specs: Vec<RuleSpec> = valid
            .iter()
            .enumerate()
            .map(|(i, ok)| {
                let destination = if *ok { format!("Dir{i}") } else { "../escape".to_string() };
                RuleSpec::new(&format!("rule{i}"), "*", &destination, i as i64)
            })
            .collect();
        let compiled = compile(&specs);
        let valid_count = valid.iter().filter(|ok| **ok).count();
        prop_assert_eq!(compiled.matcher.len(), valid_count);
        prop_assert_eq!(compiled.errors.len(), valid.len() - valid_count);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn planned_destinations_are_unique_and_free(
        names in prop::collection::hash_set("[a-c]{1,2}", 1..6),
        existing in prop::collection::hash_set("[a-c]{1,2}(_1)?", 0..6),
    ) {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("tree");
        for name in &names {
            // the same base name in two places forces in-plan collisions
            fs::create_dir_all(tree.join("x")).unwrap();
            fs::write(tree.join(format!("{name}.jpg")), "top").unwrap();
            fs::write(tree.join("x").join(format!("{name}.jpg")), "nested").unwrap();
        }
        fs::create_dir_all(tree.join("Images")).unwrap();
        for name in &existing {
            fs::write(tree.join("Images").join(format!("{name}.jpg")), "old").unwrap();
        }

        let mut config = Config::new(&tree, Action::Organize(OrganizeMode::ByType));
        config.file_pattern = "**/*.jpg".to_string();
        let orchestrator = Orchestrator::new(UndoManager::new(temp.path().join("log.json")));
        let plan = orchestrator.plan(&config).unwrap();

        let mut destinations = HashSet::new();
        for op in &plan.operations {
            prop_assert!(destinations.insert(op.destination.clone()));
            if !op.source.starts_with(tree.join("Images")) {
                prop_assert!(!op.destination.exists());
            }
        }
        prop_assert!(plan.preview_results().is_consistent());
    }
}
