tonic::include_proto!("foldqueue");
