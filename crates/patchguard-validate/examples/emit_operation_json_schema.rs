use patchguard_validate::operation_json_schema;

fn main() {
    let schema = operation_json_schema();
    let json = serde_json::to_string_pretty(&schema).expect("serialize operation json schema");
    println!("{json}");
}
