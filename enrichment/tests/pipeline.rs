use async_trait::async_trait;
use autologue_enrichment::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

const DESCRIPTION: &str =
    "Le Korg Minilogue est un synthétiseur analogique polyphonique à quatre voix.[1]";

/// Answers each prompt from a script; the last scripted answer repeats.
#[derive(Default)]
struct ScriptedClient {
    script: Mutex<HashMap<String, VecDeque<String>>>,
    failing_subjects: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    fn complete() -> Self {
        let client = Self::default();
        client.answer("description", DESCRIPTION);
        client.answer("price", "Prix constaté: **549** €");
        client.answer("length", "**50** cm");
        client.answer("height", "**8.5** cm");
        client.answer("width", "**30** cm");
        client.answer("weight", "**2,8** kg");
        client.answer("technical", "```json\n{\"voix\": 4, \"oscillateurs\": 2}\n```");
        client.answer("documentation", "Manuel: https://www.korg.com/minilogue.pdf");
        client
    }

    fn answer(&self, prompt: &str, answer: &str) {
        self.script
            .lock()
            .unwrap()
            .entry(prompt.to_string())
            .or_default()
            .push_back(answer.to_string());
    }

    fn replace(&self, prompt: &str, answers: &[&str]) {
        self.script
            .lock()
            .unwrap()
            .insert(prompt.to_string(), answers.iter().map(ToString::to_string).collect());
    }

    fn fail_for(mut self, subject: &str) -> Self {
        self.failing_subjects.insert(subject.to_string());
        self
    }

    fn subjects(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, subject)| subject.clone()).collect()
    }

    fn prompts_for(&self, subject: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s == subject)
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl EnrichmentClient for ScriptedClient {
    async fn query(&self, prompt: &str, subject: &str) -> QueryOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), subject.to_string()));
        if self.failing_subjects.contains(subject) {
            return QueryOutcome::from_reply(Some(FAILURE_SENTINEL.to_string()));
        }
        let mut script = self.script.lock().unwrap();
        let reply = script.get_mut(prompt).and_then(|answers| {
            if answers.len() > 1 {
                answers.pop_front()
            } else {
                answers.front().cloned()
            }
        });
        QueryOutcome::from_reply(reply)
    }
}

fn prompts() -> PromptSet {
    PromptSet {
        description: "description".into(),
        price: "price".into(),
        dimensions: ["length".into(), "height".into(), "width".into(), "weight".into()],
        technical: "technical".into(),
        documentation: "documentation".into(),
    }
}

fn pipeline(
    client: &Arc<ScriptedClient>,
    filter: PriceFilter,
    dir: &Path,
) -> Pipeline<Arc<ScriptedClient>> {
    let ledger = Ledger::load(dir.join("src/context.json")).unwrap();
    Pipeline::new(
        Arc::clone(client),
        prompts(),
        filter,
        ledger,
        RecordSink::new(dir.join("errors.csv")),
    )
}

fn synth(name: &str) -> Record {
    Record::new("21", name, "Synthétiseur", "Minilogue", "Synthétiseur")
}

fn rows(path: &Path) -> Vec<csv::StringRecord> {
    if !path.exists() {
        return Vec::new();
    }
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(|row| row.unwrap())
        .collect()
}

fn write_table(path: &Path, names: &[&str]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut content = String::from(
        "id\tname\ttype\tmodel\tdescription\tprice\tlength_cm\theight_cm\twidth_cm\tweight_kg\ttechnical_specs\ttechnical_doc\tcategory\n",
    );
    for (id, name) in names.iter().enumerate() {
        content.push_str(&format!(
            "{id}\t{name}\tSynthétiseur\tX\tnan\tnan\tnan\tnan\tnan\tnan\t[]\tnan\tSynthétiseur\n"
        ));
    }
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_complete_answers_are_accepted_with_full_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ScriptedClient::complete());
    let mut pipeline = pipeline(&client, PriceFilter::new(), dir.path());
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let outcome = pipeline.process_record(synth("Korg Minilogue"), &output).await.unwrap();

    assert_eq!(outcome, RecordOutcome::Accepted { confidence: 100.0 });
    assert_eq!(client.subjects().len(), 8);
    let written = rows(output.path());
    assert_eq!(written.len(), 1);
    assert_eq!(&written[0][5], "549");
    assert_eq!(&written[0][9], "2,8");
    let specs: serde_json::Value = serde_json::from_str(&written[0][10]).unwrap();
    assert_eq!(specs, serde_json::json!({"voix": 4, "oscillateurs": 2}));
    assert_eq!(&written[0][12], "100.0");
    assert!(pipeline.ledger().is_processed("Korg Minilogue"));
    assert!(!dir.path().join("errors.csv").exists());
}

#[tokio::test]
async fn test_processed_name_is_never_requeried() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ScriptedClient::complete());
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let mut first = pipeline(&client, PriceFilter::new(), dir.path());
    first.process_record(synth("Korg Minilogue"), &output).await.unwrap();
    let queries = client.subjects().len();

    let mut second = pipeline(&client, PriceFilter::new(), dir.path());
    let outcome = second.process_record(synth("Korg Minilogue"), &output).await.unwrap();

    assert_eq!(outcome, RecordOutcome::Skipped);
    assert_eq!(client.subjects().len(), queries);
    assert_eq!(rows(output.path()).len(), 1);
}

#[tokio::test]
async fn test_price_far_from_cache_scores_fifty() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("src/context.json");
    std::fs::create_dir_all(ledger_path.parent().unwrap()).unwrap();
    std::fs::write(
        &ledger_path,
        r#"{
            "instruments_processed": ["A", "B"],
            "price_cache": ["A : 1000", "B : 1000"],
            "dimensions_cache": [],
            "failed_searches": [],
            "last_updated": "01-10-26-09h00:00"
        }"#,
    )
    .unwrap();

    let client = Arc::new(ScriptedClient::complete());
    client.replace("price", &["**4000** €"]);
    let mut pipeline = pipeline(&client, PriceFilter::new(), dir.path());
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let outcome = pipeline.process_record(synth("Korg Minilogue"), &output).await.unwrap();

    assert_eq!(outcome, RecordOutcome::Accepted { confidence: 50.0 });
    assert_eq!(&rows(output.path())[0][12], "50.0");
    assert_eq!(
        pipeline.ledger().document().price_cache,
        vec!["A : 1000", "B : 1000", "Korg Minilogue : 4000"]
    );
}

#[tokio::test]
async fn test_out_of_band_price_is_requeried_then_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ScriptedClient::complete());
    client.replace("price", &["**9999** €", "**549** €"]);
    let filter = PriceFilter::new().with_band("Synthétiseur", 150.0, 3500.0);
    let mut pipeline = pipeline(&client, filter, dir.path());
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let outcome = pipeline.process_record(synth("Korg Minilogue"), &output).await.unwrap();

    assert!(matches!(outcome, RecordOutcome::Accepted { .. }));
    let prompts = client.prompts_for("Korg Minilogue");
    assert_eq!(prompts.len(), 9);
    assert_eq!(prompts[8], "price");

    let errors = rows(&dir.path().join("errors.csv"));
    assert_eq!(errors.len(), 1);
    assert_eq!(&errors[0][5], "N/A");
    assert_eq!(&errors[0][14], "1");
    assert!(!pipeline.ledger().is_failing("Korg Minilogue"));
}

#[tokio::test]
async fn test_five_prior_failures_abandon_on_next_failure() {
    let dir = tempfile::tempdir().unwrap();
    let errors = RecordSink::new(dir.path().join("errors.csv"));
    for _ in 0..5 {
        errors.append(&synth("Korg Minilogue")).unwrap();
    }

    let client = Arc::new(ScriptedClient::complete());
    client.replace("description", &["trop court"]);
    let mut pipeline = pipeline(&client, PriceFilter::new(), dir.path());
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let outcome = pipeline.process_record(synth("Korg Minilogue"), &output).await.unwrap();

    assert_eq!(outcome, RecordOutcome::Abandoned { retries: 6 });
    let written = rows(output.path());
    assert_eq!(written.len(), 1);
    assert_eq!(&written[0][12], "0.0");
    assert_eq!(&written[0][14], "6");
    assert_eq!(rows(errors.path()).len(), 5);
    assert!(pipeline.ledger().is_failing("Korg Minilogue"));
}

#[tokio::test]
async fn test_retry_loop_is_bounded_for_fresh_record() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ScriptedClient::complete());
    client.replace("documentation", &["Pas de manuel disponible."]);
    let mut pipeline = pipeline(&client, PriceFilter::new(), dir.path());
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let outcome = pipeline.process_record(synth("Korg Minilogue"), &output).await.unwrap();

    assert_eq!(outcome, RecordOutcome::Abandoned { retries: 5 });
    let errors = rows(&dir.path().join("errors.csv"));
    let retries: Vec<&str> = errors.iter().map(|row| &row[14]).collect();
    assert_eq!(retries, vec!["1", "2", "3", "4"]);
    assert_eq!(rows(output.path()).len(), 1);
    // 8 initial queries then only the documentation on each of 4 retries.
    assert_eq!(client.prompts_for("Korg Minilogue").len(), 12);
}

#[tokio::test]
async fn test_raised_retry_ceiling_retries_until_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ScriptedClient::complete());
    client.replace("documentation", &["Pas de manuel disponible."]);
    let mut pipeline = pipeline(&client, PriceFilter::new(), dir.path())
        .with_config(PipelineConfig::default().with_max_retries(8));
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let outcome = pipeline.process_record(synth("Korg Minilogue"), &output).await.unwrap();

    assert_eq!(outcome, RecordOutcome::Abandoned { retries: 9 });
    assert_eq!(rows(&dir.path().join("errors.csv")).len(), 8);
    let written = rows(output.path());
    assert_eq!(written.len(), 1);
    assert_eq!(&written[0][14], "9");
}

#[tokio::test]
async fn test_upstream_failure_stops_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("inputs/input_Synthétiseur.tsv");
    write_table(&input, &["Korg Minilogue", "Moog Subsequent 37", "Arturia MiniFreak"]);

    let client = Arc::new(ScriptedClient::complete().fail_for("Moog Subsequent 37"));
    let mut pipeline = pipeline(&client, PriceFilter::new(), dir.path());
    let output = RecordSink::new(dir.path().join("outputs/output_Synthétiseur.csv"));

    let report = pipeline.process_table(&input, &output).await.unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.metrics.cycles, 2);
    assert_eq!(client.prompts_for("Moog Subsequent 37"), vec!["description"]);
    assert!(client.prompts_for("Arturia MiniFreak").is_empty());

    let written = rows(output.path());
    assert_eq!(written.len(), 1);
    assert_eq!(&written[0][1], "Korg Minilogue");
    assert!(!dir.path().join("errors.csv").exists());
    assert!(!pipeline.ledger().is_failing("Moog Subsequent 37"));
}

#[tokio::test]
async fn test_family_processes_every_category_table() {
    let root = tempfile::tempdir().unwrap();
    let family = Family::by_name("Keyboards").unwrap();
    let layout = family.layout(root.path());
    write_table(&layout.input_table("Synthétiseur"), &["Korg Minilogue"]);
    write_table(&layout.input_table("Workstation"), &["Korg Nautilus"]);
    std::fs::write(layout.inputs().join("notes.txt"), "ignored").unwrap();

    let client = Arc::new(ScriptedClient::complete());
    let mut pipeline =
        Pipeline::for_family(Arc::clone(&client), prompts(), family, root.path()).unwrap();

    let reports = pipeline.process_family(family, root.path()).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports.iter().map(|r| r.accepted).sum::<usize>(), 2);
    assert_eq!(rows(&layout.output_table("Synthétiseur")).len(), 1);
    assert_eq!(rows(&layout.output_table("Workstation")).len(), 1);

    let reloaded = Ledger::load(layout.ledger()).unwrap();
    assert_eq!(
        reloaded.document().instruments_processed,
        vec!["Korg Minilogue", "Korg Nautilus"]
    );
}
