fn main() {
    println!("cargo:rerun-if-changed=./foldqueue.proto");
    tonic_build::compile_protos("./foldqueue.proto")
        .unwrap_or_else(|err| panic!("Failed to compile protos {:?}", err));
}
