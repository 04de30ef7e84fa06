/// テストで使い回すメタ情報JSON。スタイルIDは0, 2, 3。
pub(crate) const SAMPLE_METAS_JSON: &str = r#"
[
    {
        "name": "dummy1",
        "styles": [
            {"name": "style1", "id": 0},
            {"name": "style2", "id": 2}
        ],
        "version": "0.0.1",
        "speaker_uuid": "574bc678-8370-44be-b941-08e46e7b47d7"
    },
    {
        "name": "dummy2",
        "styles": [
            {"name": "style3", "id": 3}
        ],
        "version": "0.0.1",
        "speaker_uuid": "dd9ccd75-75f6-40ce-a3db-960cbed2e905"
    }
]
"#;
