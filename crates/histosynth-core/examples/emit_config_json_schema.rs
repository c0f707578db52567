use histosynth_core::PipelineConfig;
use schemars::schema_for;

fn main() {
    let schema = schema_for!(PipelineConfig);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
