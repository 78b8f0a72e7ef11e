#[cfg(test)]
mod tests {
    use crate::catalog::{
        AccessLevel, EventCatalog, FieldCatalog, FieldMeta, FieldType, ProjectCatalogs,
        RawRecordRow,
    };
    use crate::core::render::{BasicRenderer, RenderEngine};
    use crate::core::validation::tokenizer::{Builtin, Token};
    use crate::errors::{
        DataFault, ErrorCategory, ErrorKind, RenderError, TemplateError, ValidationError,
    };
    use crate::markup::strip_tags;
    use crate::settings::{DEFAULT_REDACTION, Settings};
    use crate::types::{FieldValue, RenderContext};
    use crate::{
        FilledDocument, Template, TemplateFactory, fill_template, merge_record, prune_empty,
        reshape, tokenize, validate_template,
    };

    fn init() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init();
    }

    fn field_catalog() -> FieldCatalog {
        let mut fields = FieldCatalog::new();
        let demographics =
            |field_type: FieldType| FieldMeta::new(field_type).with_instrument("demographics");
        fields
            .insert_field("record_id", demographics(FieldType::Text).with_validation("integer"))
            .insert_field("name", demographics(FieldType::Text).identifier())
            .insert_field("age", demographics(FieldType::Text).with_validation("integer"))
            .insert_field("dob", demographics(FieldType::Text).with_validation("date_ymd"))
            .insert_field("consent", demographics(FieldType::Text))
            .insert_field("comments", demographics(FieldType::Notes))
            .insert_field(
                "weekdays",
                FieldMeta::new(FieldType::Checkbox)
                    .with_choices("1, Monday | 2, Tuesday | 3, Wednesday")
                    .with_instrument("schedule"),
            )
            .insert_field(
                "contact_by",
                FieldMeta::new(FieldType::Checkbox)
                    .identifier()
                    .with_choices("1, Phone | 2, Email")
                    .with_instrument("schedule"),
            )
            .insert_field(
                "weight",
                FieldMeta::new(FieldType::Text)
                    .with_validation("number")
                    .with_instrument("visits"),
            );
        fields
    }

    fn classical() -> ProjectCatalogs {
        ProjectCatalogs::new(field_catalog(), EventCatalog::default())
    }

    fn longitudinal() -> ProjectCatalogs {
        let events = ["baseline_arm_1", "followup_arm_1"].into_iter().collect();
        ProjectCatalogs::new(field_catalog(), events)
    }

    fn body_errors(body: &str, catalogs: &ProjectCatalogs) -> Vec<ValidationError> {
        let template = Template::new().set_name("test").set_body(body).build();
        validate_template(&template, catalogs)
    }

    fn text_of(markup: &str) -> String {
        strip_tags(markup).split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn fill(
        template: &Template,
        rows: &[RawRecordRow],
        catalogs: &ProjectCatalogs,
    ) -> Result<FilledDocument, TemplateError> {
        let settings = Settings::default();
        let renderer = BasicRenderer::new();
        fill_template(template, rows, catalogs, AccessLevel::Full, &settings, &renderer)
    }

    #[test]
    fn test_well_formed_expressions() {
        init();

        let catalogs = longitudinal();
        let expressions = [
            "{if $redcap['age'] gt 16}",
            "{elseif $redcap['age'] le 16 and $redcap['consent'] eq 'Yes'}",
            "{if ($redcap['age'] gte 18 or $redcap['consent'] neq 'No') \
             and not in_array('Monday', $redcap['weekdays'])}",
            "{if not ($redcap['age'] lt 5)}",
            "{if $showLabelAndRow}",
            "{if $showLabelAndRow eq 1}",
            "{if $redcap['followup_arm_1']['weight'] ge 70.5}",
            "{$redcap['weekdays']['allValues']}",
            "{$redcap['baseline_arm_1']['weekdays']['allValues']}",
            "{$redcap['demographics_complete']}",
            "{$redcap['schedule_timestamp']}",
            "{$redcap['age']['allValues']}",
            "{else}",
            "{/if}",
            "{endif}",
        ];

        for expression in expressions {
            let errors = body_errors(expression, &catalogs);
            let errors: Vec<_> = errors
                .iter()
                .filter(|e| e.kind != ErrorKind::Structural)
                .collect();
            assert!(errors.is_empty(), "{} produced {:?}", expression, errors);
        }
    }

    #[test]
    fn test_grammar_errors() {
        init();

        let catalogs = classical();
        let cases = [
            ("{if}", "Expression cannot end with 'if'"),
            ("{if $redcap['age'] gt}", "Expression cannot end with 'gt'"),
            ("{if $redcap['age'] gt gt 3}", "'gt' cannot follow 'gt'"),
            ("{if $redcap ['age'] eq 1}", "Unexpected space before '['"),
            ("{$redcap['age'] eq 1 and}", "Expression cannot end with 'and'"),
            ("{if $redcap['age'] eq 1 bogus}", "Unknown word 'bogus'"),
            ("{if ($redcap['age'] eq 1}", "Unbalanced parentheses"),
            ("{if $redcap['age' eq 1}", "Unbalanced brackets"),
            ("{if $redcap['age] eq 1}", "Unbalanced quotes"),
            ("{if $redcap['consent'] eq 'It\\'s'}", "Unbalanced quotes"),
            ("{if $redcap['consent'] eq \"It's\"}", "Unbalanced quotes"),
            ("{if $redcap['age'] eq <b>1</b>}", "contains markup"),
            ("{'age'}", "Expression cannot start with"),
        ];

        for (expression, expected) in cases {
            let errors = body_errors(expression, &catalogs);
            assert!(
                errors.iter().any(|e| e.message.contains(expected) && e.kind == ErrorKind::Syntax),
                "{} should report {:?}, got {:?}",
                expression,
                expected,
                errors
            );
        }
    }

    #[test]
    fn test_unbalanced_braces_skip_line() {
        init();

        let errors = body_errors("line one\n{if $redcap['nope'] eq 1\n{/if}", &classical());
        let syntax_on_two = errors
            .iter()
            .filter(|e| e.line == 2 && e.kind == ErrorKind::Syntax)
            .count();
        assert_eq!(syntax_on_two, 1);
        // the unknown field on the broken line is never looked at
        assert!(!errors.iter().any(|e| e.message.contains("nope")));
    }

    #[test]
    fn test_nested_expression_braces() {
        init();

        let errors = body_errors("{if $redcap['age'] eq {1}}", &classical());
        assert!(errors.iter().any(|e| e.message.contains("nested")), "{:?}", errors);
    }

    #[test]
    fn test_reference_errors() {
        init();

        let catalogs = longitudinal();
        let cases = [
            ("{$redcap['unknown']}", "Unknown field 'unknown'"),
            ("{$redcap['nowhere_arm_1']['age']}", "Unknown event or field 'nowhere_arm_1'"),
            ("{$redcap['baseline_arm_1']}", "is an event"),
            ("{$redcap[\"age\"]}", "must use single quotes"),
            ("{$redcap['age']['extra']}", "Unexpected ['extra']"),
            ("{if in_array('Monday', $redcap['age'])}", "can only search checkbox fields"),
            ("{if in_array('Sunday', $redcap['weekdays'])}", "is not a choice"),
        ];

        for (expression, expected) in cases {
            let errors = body_errors(expression, &catalogs);
            assert!(
                errors
                    .iter()
                    .any(|e| e.message.contains(expected) && e.kind == ErrorKind::Semantic),
                "{} should report {:?}, got {:?}",
                expression,
                expected,
                errors
            );
        }
    }

    #[test]
    fn test_checkbox_usage() {
        init();

        let catalogs = classical();
        let allowed = body_errors("{if in_array('Monday', $redcap['weekdays'])}\n{/if}", &catalogs);
        assert!(allowed.is_empty(), "{:?}", allowed);

        let bare = body_errors("{$redcap['weekdays']}", &catalogs);
        assert_eq!(bare.len(), 1, "{:?}", bare);
        assert_eq!(bare[0].kind, ErrorKind::Semantic);
        assert_eq!(bare[0].line, 1);
        assert!(bare[0].message.contains("['allValues']"));
    }

    #[test]
    fn test_errors_are_tagged_by_region() {
        init();

        let template = Template::new()
            .set_name("regions")
            .set_header("{$redcap['missing_one']}")
            .set_footer("ok\n{else}")
            .set_body("{if $redcap['age'] eq 1}\n{/if}")
            .build();
        let errors = validate_template(&template, &classical());

        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert_eq!(errors[0].category, ErrorCategory::Header);
        assert_eq!(errors[1].category, ErrorCategory::Footer);
        assert_eq!(errors[1].line, 2);
        assert_eq!(errors[1].to_string(), "footer line 2: {else} outside of any {if} block");
    }

    #[test]
    fn test_template_keeps_last_validation() {
        init();

        let catalogs = classical();
        let mut template = Template::new().set_body("{$redcap['nope']}").build();
        assert_eq!(template.validate(&catalogs).len(), 1);
        assert!(!template.is_valid());

        let mut template = Template::new().set_body("{$redcap['age']}").build();
        template.validate(&catalogs);
        assert!(template.is_valid());
    }

    #[test]
    fn test_nested_blocks_are_clean() {
        init();

        let document = [
            "<p>{if $redcap['age'] gt 16}",
            "  {if $redcap['consent'] eq 'Yes'}",
            "    {if in_array('Monday', $redcap['weekdays'])}Monday{else}Other{/if}",
            "  {elseif $redcap['consent'] eq 'No'}",
            "    refused",
            "  {else}",
            "    unknown",
            "  {/if}",
            "{/if}</p>",
        ];
        assert!(crate::validate_blocks(&document).is_empty());

        let without_last = &document[..document.len() - 1];
        let errors = crate::validate_blocks(without_last);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].line, 1);
        assert!(errors[0].message.contains("Missing {/if}"));
    }

    #[test]
    fn test_unmatched_else_on_line_five() {
        init();

        let document = ["a", "{if $redcap['age'] eq 1}", "b", "{/if}", "{else}", "c"];
        let errors = crate::validate_blocks(&document);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].line, 5);
        assert_eq!(errors[0].kind, ErrorKind::Structural);
    }

    #[test]
    fn test_two_elses_in_one_block() {
        init();

        let document = [
            "{if $redcap['age'] eq 1}",
            "one",
            "{else}",
            "two",
            "{else}",
            "three",
            "{/if}",
        ];
        let errors = crate::validate_blocks(&document);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].line, 5);
        assert!(errors[0].message.contains("More than one {else}"));
    }

    #[test]
    fn test_else_in_nested_block_belongs_to_inner() {
        init();

        let document = [
            "{if $redcap['age'] eq 1}",
            "{if $redcap['age'] eq 2}{else}{/if}",
            "{else}",
            "{/if}",
        ];
        assert!(crate::validate_blocks(&document).is_empty());
    }

    #[test]
    fn test_elseif_after_else_and_extra_endif() {
        init();

        let document = [
            "{if $redcap['age'] eq 1}",
            "{else}",
            "{elseif $redcap['age'] eq 2}",
            "{/if}",
            "{/if}",
        ];
        let errors = crate::validate_blocks(&document);
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert_eq!(errors[0].line, 3);
        assert!(errors[0].message.contains("after {else}"));
        assert_eq!(errors[1].line, 5);
        assert!(errors[1].message.contains("Extra {/if}"));
    }

    #[test]
    fn test_comparison_after_not_is_accepted() {
        // Each operator checks only its direct neighbours, so `eq not ...` is
        // accepted even though it reads oddly. Kept until the authoring guide
        // says otherwise.
        init();

        let tokens = crate::tokenize("if $redcap['age'] eq not $redcap['consent']");
        assert!(crate::validate_grammar(&tokens, 1).is_empty());

        let tokens = crate::tokenize("if $redcap['age'] eq and 1");
        assert_eq!(crate::validate_grammar(&tokens, 1).len(), 1);
    }

    #[test]
    fn test_tokenize() {
        init();

        let str_token = |content: &str| Token::Str {
            quote: '\'',
            content: content.to_string(),
        };

        // punctuation inside a quoted run stays part of it
        assert_eq!(tokenize("'a, (b) [c]'"), vec![str_token("a, (b) [c]")]);
        assert_eq!(tokenize("'It\\'s'"), vec![str_token("It's")]);

        assert_eq!(
            tokenize("in_array('x',$redcap['f'])"),
            vec![
                Token::Function("in_array".to_string()),
                Token::OpenParen,
                str_token("x"),
                Token::Comma,
                Token::Builtin(Builtin::Redcap),
                Token::OpenBracket { spaced: false },
                str_token("f"),
                Token::CloseBracket,
                Token::CloseParen,
            ]
        );

        assert_eq!(tokenize("$redcap ['x']")[1], Token::OpenBracket { spaced: true });
        assert_eq!(tokenize("$redcap['x']")[1], Token::OpenBracket { spaced: false });
    }

    #[test]
    fn test_reshape_and_redaction() {
        init();

        let fields = field_catalog();
        let settings = Settings::default();
        let row = RawRecordRow::new()
            .with("name", "Ada")
            .with("age", " 18 ")
            .with("dob", "2001-02-03")
            .with("consent", "<b>Yes</b>")
            .with("comments", "line <1>\nline 2")
            .with("weekdays", "3,1")
            .with("contact_by", "2")
            .with("demographics_complete", "2");

        let full = reshape(&row, &fields, AccessLevel::Full, &settings);
        assert_eq!(full["name"], FieldValue::from("Ada"));
        assert_eq!(full["age"], FieldValue::from("18"));
        assert_eq!(full["consent"], FieldValue::from("Yes"));
        assert_eq!(full["comments"], FieldValue::from("line &lt;1&gt;<br />\nline 2"));
        assert_eq!(
            full["weekdays"],
            FieldValue::Checkbox {
                labels: vec!["Monday".to_string(), "Wednesday".to_string()],
                all_values: "Monday, Wednesday".to_string(),
            }
        );
        assert_eq!(full["demographics_complete"], FieldValue::from("2"));

        let hidden = reshape(&row, &fields, AccessLevel::DeIdentified, &settings);
        assert_eq!(hidden["name"], FieldValue::from(DEFAULT_REDACTION));
        assert_eq!(hidden["dob"], FieldValue::from(DEFAULT_REDACTION));
        assert_eq!(hidden["consent"], FieldValue::from(DEFAULT_REDACTION));
        assert_eq!(hidden["comments"], FieldValue::from(DEFAULT_REDACTION));
        assert_eq!(hidden["age"], FieldValue::from("18"));
        assert_eq!(hidden["weekdays"], full["weekdays"]);
        assert_eq!(
            hidden["contact_by"],
            FieldValue::Checkbox {
                labels: vec![],
                all_values: DEFAULT_REDACTION.to_string(),
            }
        );

        let removed = reshape(&row, &fields, AccessLevel::IdentifiersRemoved, &settings);
        assert_eq!(removed["name"], FieldValue::from(DEFAULT_REDACTION));
        assert_eq!(removed["consent"], FieldValue::from("Yes"));
        assert_eq!(removed["dob"], FieldValue::from("2001-02-03"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        init();

        let catalogs = classical();
        let settings = Settings::default();
        let row = RawRecordRow::new()
            .with("record_id", "1")
            .with("age", "40")
            .with("weekdays", "2");

        let merge = |rows: &[RawRecordRow]| {
            merge_record(rows, &catalogs, AccessLevel::Full, &settings).unwrap()
        };
        let once = merge(std::slice::from_ref(&row));
        let twice = merge(&[row.clone(), row.clone()]);
        assert_eq!(once, twice);
        assert_eq!(once.fields, reshape(&row, &catalogs.fields, AccessLevel::Full, &settings));
    }

    #[test]
    fn test_latest_instance_wins() {
        init();

        let catalogs = classical();
        let rows = vec![
            RawRecordRow::new().with("record_id", "1").with("age", "40"),
            RawRecordRow::new().repeating("visits", 1).with("weight", "70"),
            RawRecordRow::new().repeating("visits", 3).with("weight", "72"),
            RawRecordRow::new().repeating("visits", 2).with("weight", "75"),
        ];
        let context =
            merge_record(&rows, &catalogs, AccessLevel::Full, &Settings::default()).unwrap();

        assert_eq!(context.fields["weight"], FieldValue::from("72"));
        assert_eq!(context.fields["age"], FieldValue::from("40"));
    }

    #[test]
    fn test_repeating_rows_never_override_plain_rows() {
        init();

        let catalogs = classical();
        let rows = vec![
            RawRecordRow::new()
                .repeating("visits", 2)
                .with("age", "99")
                .with("weight", "80"),
            RawRecordRow::new().with("age", "40").with("weight", ""),
        ];
        let context =
            merge_record(&rows, &catalogs, AccessLevel::Full, &Settings::default()).unwrap();

        // age belongs to demographics, so the visits row cannot supply it
        assert_eq!(context.fields["age"], FieldValue::from("40"));
        // a blank plain value yields to the repeating one
        assert_eq!(context.fields["weight"], FieldValue::from("80"));
    }

    #[test]
    fn test_longitudinal_merge() {
        init();

        let catalogs = longitudinal();
        let rows = vec![
            RawRecordRow::new().in_event("followup_arm_1").with("age", "41"),
            RawRecordRow::new()
                .in_event("baseline_arm_1")
                .with("age", "40")
                .with("consent", "Yes"),
            RawRecordRow::new()
                .in_event("followup_arm_1")
                .event_instance(1)
                .with("weight", "70"),
            RawRecordRow::new()
                .in_event("followup_arm_1")
                .event_instance(2)
                .with("weight", "68"),
        ];
        let context =
            merge_record(&rows, &catalogs, AccessLevel::Full, &Settings::default()).unwrap();

        assert!(context.is_longitudinal());
        assert_eq!(context.first_event.as_deref(), Some("baseline_arm_1"));
        assert_eq!(context.fields["age"], FieldValue::from("40"));
        assert_eq!(context.events["followup_arm_1"]["age"], FieldValue::from("41"));
        assert_eq!(context.events["followup_arm_1"]["weight"], FieldValue::from("68"));
        assert!(!context.has_field(None, "weight"));

        let json = context.to_json();
        assert_eq!(json["redcap"]["age"], "40");
        assert_eq!(json["redcap"]["followup_arm_1"]["weight"], "68");
    }

    #[test]
    fn test_repeating_instrument_per_event() {
        init();

        let catalogs = longitudinal();
        let visit = |event: &str, instance: u32, weight: &str| {
            RawRecordRow::new()
                .in_event(event)
                .repeating("visits", instance)
                .with("weight", weight)
        };
        let rows = vec![
            RawRecordRow::new().in_event("baseline_arm_1").with("age", "40"),
            visit("baseline_arm_1", 1, "70"),
            visit("followup_arm_1", 3, "80"),
            visit("baseline_arm_1", 2, "71"),
            visit("followup_arm_1", 1, "82"),
        ];
        let context =
            merge_record(&rows, &catalogs, AccessLevel::Full, &Settings::default()).unwrap();

        assert_eq!(context.events["baseline_arm_1"]["weight"], FieldValue::from("71"));
        assert_eq!(context.events["followup_arm_1"]["weight"], FieldValue::from("80"));
        assert_eq!(context.fields["weight"], FieldValue::from("71"));

        let template = Template::new()
            .set_body("{$redcap['weight']}/{$redcap['followup_arm_1']['weight']}")
            .build();
        assert_eq!(fill(&template, &rows, &catalogs).unwrap().body, "71/80");
    }

    #[test]
    fn test_merge_faults() {
        init();

        let settings = Settings::default();
        assert_eq!(
            merge_record(&[], &classical(), AccessLevel::Full, &settings),
            Err(DataFault::EmptyRecord)
        );

        let row = RawRecordRow {
            repeat_instrument: Some("visits".to_string()),
            ..Default::default()
        };
        assert_eq!(
            merge_record(&[row], &classical(), AccessLevel::Full, &settings),
            Err(DataFault::MissingInstance {
                instrument: "visits".to_string()
            })
        );

        let row = RawRecordRow::new().with("age", "1");
        assert_eq!(
            merge_record(&[row], &longitudinal(), AccessLevel::Full, &settings),
            Err(DataFault::MissingEvent)
        );
    }

    #[test]
    fn test_consent_scenario() {
        init();

        let catalogs = classical();
        let template = Template::new()
            .set_name("consent")
            .set_body(
                "<p><span>{if $redcap['age'] gt 16} Consent: \
                 <span>{if $redcap['consent'] eq 'Yes'} Yes {/if}</span>{/if}</span></p>",
            )
            .build();
        assert!(validate_template(&template, &catalogs).is_empty());

        let body = |age: &str, consent: &str| {
            let rows = [RawRecordRow::new().with("age", age).with("consent", consent)];
            fill(&template, &rows, &catalogs).unwrap().body
        };

        assert_eq!(text_of(&body("18", "Yes")), "Consent: Yes");

        let declined = body("18", "No");
        assert_eq!(text_of(&declined), "Consent:");
        assert_eq!(declined, "<p><span> Consent: </span></p>");

        assert_eq!(body("10", "Yes"), "");
    }

    #[test]
    fn test_fill_requires_referenced_fields() {
        init();

        let catalogs = longitudinal();
        let template = Template::new()
            .set_body("{if $redcap['age'] gt 1}{$redcap['followup_arm_1']['weight']}{/if}")
            .build();
        let rows = [RawRecordRow::new().in_event("baseline_arm_1").with("age", "40")];

        match fill(&template, &rows, &catalogs) {
            Err(TemplateError::DataFault(DataFault::FieldNotInRecord { field, event })) => {
                assert_eq!(field, "weight");
                assert_eq!(event.as_deref(), Some("followup_arm_1"));
            }
            other => panic!("expected a data fault, got {:?}", other),
        }
    }

    #[test]
    fn test_fill_all_regions() {
        init();

        let catalogs = longitudinal();
        let template = Template::new()
            .set_header("<h1>Record {$redcap['record_id']}</h1>")
            .set_footer("<small>{$redcap['followup_arm_1']['weekdays']['allValues']}</small>")
            .set_body("<p>{$redcap['name']}</p><p>{$redcap['comments']}</p>")
            .build();
        let rows = [
            RawRecordRow::new()
                .in_event("baseline_arm_1")
                .with("record_id", "7")
                .with("name", "Ada")
                .with("comments", "a\nb"),
            RawRecordRow::new().in_event("followup_arm_1").with("weekdays", "1,2"),
        ];

        let full = fill(&template, &rows, &catalogs).unwrap();
        assert_eq!(full.header, "<h1>Record 7</h1>");
        assert_eq!(full.footer, "<small>Monday, Tuesday</small>");
        assert_eq!(full.body, "<p>Ada</p><p>a<br />\nb</p>");

        let settings = Settings::from_json(r#"{"redaction_placeholder": "***"}"#).unwrap();
        let renderer = BasicRenderer::new();
        let access = AccessLevel::DeIdentified;
        let hidden =
            fill_template(&template, &rows, &catalogs, access, &settings, &renderer).unwrap();
        assert_eq!(hidden.body, "<p>***</p><p>***</p>");
    }

    #[test]
    fn test_fill_keeps_lone_angle_brackets() {
        init();

        let catalogs = classical();
        let template = Template::new().set_body("<p>Answer: {$redcap['consent']}</p>").build();
        assert!(validate_template(&template, &catalogs).is_empty());

        let rows = [RawRecordRow::new().with("consent", "x<y")];
        let filled = fill(&template, &rows, &catalogs).unwrap();
        assert_eq!(filled.body, "<p>Answer: x<y</p>");
    }

    #[test]
    fn test_all_values_on_plain_field() {
        init();

        let catalogs = classical();
        let template = Template::new()
            .set_body("{$redcap['age']['allValues']} / {$redcap['weekdays']['allValues']}")
            .build();
        assert!(validate_template(&template, &catalogs).is_empty());

        let rows = [RawRecordRow::new().with("age", "18").with("weekdays", "1,3")];
        let filled = fill(&template, &rows, &catalogs).unwrap();
        assert_eq!(filled.body, "18 / Monday, Wednesday");
    }

    #[test]
    fn test_renderer_branches() {
        init();

        let catalogs = classical();
        let rows = [RawRecordRow::new()
            .with("age", "12")
            .with("consent", "No")
            .with("weekdays", "2")];
        let context =
            merge_record(&rows, &catalogs, AccessLevel::Full, &Settings::default()).unwrap();
        let renderer = BasicRenderer::new();

        let render = |region: &str| renderer.render(region, &context).unwrap();

        assert_eq!(
            render(
                "{if $redcap['age'] gt 16}adult\
                 {elseif $redcap['age'] gt 10}teen{else}child{/if}"
            ),
            "teen"
        );
        assert_eq!(
            render("{if in_array('Tuesday', $redcap['weekdays'])}yes{else}no{/if}"),
            "yes"
        );
        assert_eq!(
            render("{if not in_array('Monday', $redcap['weekdays'])}free{/if}"),
            "free"
        );
        // and binds tighter than or
        assert_eq!(
            render(
                "{if $redcap['age'] eq 12 or $redcap['age'] eq 13 \
                 and $redcap['consent'] eq 'Yes'}t{else}f{/if}"
            ),
            "t"
        );
        assert_eq!(
            render(
                "{if ($redcap['age'] eq 12 or $redcap['age'] eq 13) \
                 and $redcap['consent'] eq 'Yes'}t{else}f{/if}"
            ),
            "f"
        );
        assert_eq!(render("{if $redcap['consent'] ne 'Yes'}{$redcap['consent']}{/if}"), "No");
        assert_eq!(render("{if $showLabelAndRow}shown{else}hidden{/if}"), "hidden");
        assert_eq!(
            render("<style>p { color: red; }</style>"),
            "<style>p { color: red; }</style>"
        );
    }

    #[test]
    fn test_renderer_errors() {
        init();

        let context = RenderContext::default();
        let renderer = BasicRenderer::default();

        assert_eq!(
            renderer.render("a\n{else}", &context),
            Err(RenderError::UnexpectedMarker {
                line: 2,
                marker: "{else}".to_string()
            })
        );
        assert_eq!(
            renderer.render("{if 1 eq 1}\nopen", &context),
            Err(RenderError::UnclosedBlock { line: 1 })
        );
        assert_eq!(
            renderer.render("{$redcap['nothing']}", &context),
            Err(RenderError::UndefinedReference("$redcap['nothing']".to_string()))
        );
        assert!(matches!(
            renderer.render("{if 1 eq}{/if}", &context),
            Err(RenderError::Condition { line: 1, .. })
        ));
        assert!(matches!(
            renderer.render("{if in_array('a')}{/if}", &context),
            Err(RenderError::FunctionArgs(_))
        ));
    }

    #[test]
    fn test_prune_empty() {
        init();

        assert_eq!(prune_empty("<div><p>&nbsp;</p><p> </p></div>text").unwrap(), "text");
        let structural = "<p><br></p><p><img src=\"a.png\"/></p>";
        assert_eq!(prune_empty(structural).unwrap(), structural);
        let skeleton = "<html><body></body></html>";
        assert_eq!(prune_empty(skeleton).unwrap(), skeleton);
        assert_eq!(
            prune_empty("<table><tr><td>A</td><td> </td><td>C</td></tr></table>").unwrap(),
            "<table><tr><td>A</td><td> </td><td>C</td></tr></table>"
        );
        assert_eq!(
            prune_empty("<table><tr><td>A</td><td></td><td></td></tr></table>").unwrap(),
            "<table><tr><td>A</td></tr></table>"
        );
        let unclosed = "<p>open <b>bold</b> a < b";
        assert_eq!(prune_empty(unclosed).unwrap(), unclosed);

        // a `<` that opens no tag is text
        for text in ["x<y", "a </ b", "a <! b", "<p>1 <2</p>"] {
            assert_eq!(prune_empty(text).unwrap(), text);
        }
    }

    #[test]
    fn test_settings_from_json() {
        init();

        let settings =
            Settings::from_json(r#"{"all_values_separator": " / ", "show_label_and_row": true}"#)
                .unwrap();
        assert_eq!(settings.redaction_placeholder, DEFAULT_REDACTION);
        assert_eq!(settings.all_values_separator, " / ");
        assert!(settings.show_label_and_row);

        assert!(matches!(Settings::from_json("{"), Err(TemplateError::Settings(_))));
    }
}
