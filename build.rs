use std::{
    fs::{read_to_string, File},
    io::Write,
    path::{Path, PathBuf},
};

fn main() -> std::io::Result<()> {
    let src_dir = Path::new("src").canonicalize()?;
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    println!("cargo:rerun-if-changed=src/graph/queries");

    let mut f = File::create(out_dir.join("const_gql.rs"))?;
    write_all_gql(&src_dir, &mut f)?;

    Ok(())
}

fn write_all_gql(dir: &Path, f: &mut File) -> std::io::Result<()> {
    if dir.file_name().unwrap() == "queries" {
        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for entry_path in entries {
            if entry_path.extension().and_then(|s| s.to_str()) == Some("graphql") {
                println!("cargo:rerun-if-changed={}", entry_path.display());
                let gql_string = read_gql(entry_path.to_str().unwrap());

                let const_name = entry_path
                    .file_stem()
                    .unwrap()
                    .to_str()
                    .unwrap()
                    .to_uppercase();
                writeln!(
                    f,
                    "pub const {}: &str = r#\"{}\"#;\n",
                    const_name,
                    gql_string.trim_end()
                )?;
            }
        }
    }

    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                write_all_gql(&path, f)?;
            }
        }
    }

    Ok(())
}

fn read_gql(file_path: &str) -> String {
    read_to_string(file_path).expect("Failed to read GraphQL file")
}
